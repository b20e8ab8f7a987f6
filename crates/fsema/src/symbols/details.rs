//! Per-kind symbol details

use std::fmt;

use crate::common::Span;
use crate::evaluate::{Expr, LogicalOperator, RelationalOperator};

use super::{ArraySpec, DeclTypeSpec, Name, ScopeId, SymbolId};

/// What kind of entity a symbol is, with the data specific to that kind
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    /// Not yet resolved
    Unknown,
    /// Data object: variable, named constant, dummy, function result, component
    Object(ObjectDetails),
    /// Procedure entity: dummy procedure, procedure pointer, external declaration
    ProcEntity(ProcEntityDetails),
    Subprogram(SubprogramDetails),
    /// Name of an internal or module subprogram before its body is resolved
    SubprogramName(SubprogramNameDetails),
    /// Type-bound procedure
    ProcBinding(ProcBindingDetails),
    Generic(GenericDetails),
    DerivedType(DerivedTypeDetails),
    TypeParam(TypeParamDetails),
    Module(ModuleDetails),
    MainProgram,
    BlockData,
    /// Use-associated name
    Use(UseDetails),
    /// Use-associated name that is ambiguous
    UseError(UseErrorDetails),
    /// Host-associated name
    HostAssoc(HostAssocDetails),
    /// Construct association (ASSOCIATE, SELECT TYPE, SELECT RANK)
    AssocEntity(AssocEntityDetails),
    Misc(MiscDetails),
    CommonBlock(CommonBlockDetails),
}

impl Details {
    pub fn as_object(&self) -> Option<&ObjectDetails> {
        match self {
            Details::Object(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_proc_entity(&self) -> Option<&ProcEntityDetails> {
        match self {
            Details::ProcEntity(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_subprogram(&self) -> Option<&SubprogramDetails> {
        match self {
            Details::Subprogram(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_subprogram_name(&self) -> Option<&SubprogramNameDetails> {
        match self {
            Details::SubprogramName(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_proc_binding(&self) -> Option<&ProcBindingDetails> {
        match self {
            Details::ProcBinding(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_generic(&self) -> Option<&GenericDetails> {
        match self {
            Details::Generic(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_derived_type(&self) -> Option<&DerivedTypeDetails> {
        match self {
            Details::DerivedType(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleDetails> {
        match self {
            Details::Module(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_use_error(&self) -> Option<&UseErrorDetails> {
        match self {
            Details::UseError(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_host_assoc(&self) -> Option<&HostAssocDetails> {
        match self {
            Details::HostAssoc(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_misc(&self) -> Option<&MiscDetails> {
        match self {
            Details::Misc(details) => Some(details),
            _ => None,
        }
    }

    pub fn as_common_block(&self) -> Option<&CommonBlockDetails> {
        match self {
            Details::CommonBlock(details) => Some(details),
            _ => None,
        }
    }

    /// Short description used in dumps and messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Details::Unknown => "unknown",
            Details::Object(_) => "object",
            Details::ProcEntity(_) => "procedure entity",
            Details::Subprogram(_) => "subprogram",
            Details::SubprogramName(_) => "subprogram name",
            Details::ProcBinding(_) => "procedure binding",
            Details::Generic(_) => "generic",
            Details::DerivedType(_) => "derived type",
            Details::TypeParam(_) => "type parameter",
            Details::Module(_) => "module",
            Details::MainProgram => "main program",
            Details::BlockData => "block data",
            Details::Use(_) => "use",
            Details::UseError(_) => "use error",
            Details::HostAssoc(_) => "host association",
            Details::AssocEntity(_) => "construct association",
            Details::Misc(_) => "misc",
            Details::CommonBlock(_) => "common block",
        }
    }
}

/// CUDA data attribute of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CudaDataAttr {
    Constant,
    Device,
    Managed,
    Pinned,
    Shared,
    Texture,
    Unified,
}

impl CudaDataAttr {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let attr = match keyword {
            "constant" => CudaDataAttr::Constant,
            "device" => CudaDataAttr::Device,
            "managed" => CudaDataAttr::Managed,
            "pinned" => CudaDataAttr::Pinned,
            "shared" => CudaDataAttr::Shared,
            "texture" => CudaDataAttr::Texture,
            "unified" => CudaDataAttr::Unified,
            _ => return None,
        };
        Some(attr)
    }
}

/// CUDA ATTRIBUTES() of a subprogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CudaSubprogramAttrs {
    Host,
    Device,
    HostDevice,
    Global,
    GridGlobal,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectDetails {
    pub ty: Option<DeclTypeSpec>,
    pub shape: ArraySpec,
    pub corank: usize,
    pub is_dummy: bool,
    pub is_func_result: bool,
    /// Has an initializer in its declaration
    pub has_init: bool,
    pub common_block: Option<SymbolId>,
    pub cuda_data_attr: Option<CudaDataAttr>,
}

impl ObjectDetails {
    pub fn new(ty: Option<DeclTypeSpec>) -> Self {
        Self { ty, ..Self::default() }
    }

    pub fn with_shape(mut self, shape: ArraySpec) -> Self {
        self.shape = shape;
        self
    }

    pub fn dummy(mut self) -> Self {
        self.is_dummy = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcEntityDetails {
    /// Explicit interface or the procedure this entity is declared like
    pub interface: Option<SymbolId>,
    /// Result type of an implicit-interface function
    pub ty: Option<DeclTypeSpec>,
    pub is_dummy: bool,
    pub is_func_result: bool,
    pub has_init: bool,
}

impl ProcEntityDetails {
    pub fn has_explicit_interface(&self) -> bool {
        self.interface.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubprogramDetails {
    /// Dummy arguments in order; `None` is an alternate return (`*`)
    pub dummy_args: Vec<Option<SymbolId>>,
    pub result: Option<SymbolId>,
    pub is_interface: bool,
    pub stmt_function: bool,
    /// Interface body of a separate module procedure
    pub module_interface: Option<SymbolId>,
    /// Scope of the subprogram an ENTRY belongs to
    pub entry_scope: Option<ScopeId>,
    pub cuda_attrs: Option<CudaSubprogramAttrs>,
}

impl SubprogramDetails {
    pub fn is_function(&self) -> bool {
        self.result.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubprogramKind {
    Module,
    Internal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubprogramNameDetails {
    pub kind: SubprogramKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcBindingDetails {
    /// Procedure (or interface, for DEFERRED bindings) the binding refers to
    pub symbol: SymbolId,
    pub pass_name: Option<Name>,
}

/// Kind of defined input/output procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinedIo {
    ReadFormatted,
    ReadUnformatted,
    WriteFormatted,
    WriteUnformatted,
}

impl DefinedIo {
    /// Generic name as spelled in source
    pub fn as_source(self) -> &'static str {
        match self {
            DefinedIo::ReadFormatted => "read(formatted)",
            DefinedIo::ReadUnformatted => "read(unformatted)",
            DefinedIo::WriteFormatted => "write(formatted)",
            DefinedIo::WriteUnformatted => "write(unformatted)",
        }
    }
}

/// What a generic name denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericKind {
    Name,
    /// `operator(.foo.)`
    DefinedOperator,
    /// `assignment(=)`
    Assignment,
    Concatenate,
    Relational(RelationalOperator),
    Logical(LogicalOperator),
    /// `+`, `-`, `*`, `/`, `**`
    Numeric,
    DefinedIo(DefinedIo),
}

impl GenericKind {
    pub fn is_assignment(self) -> bool {
        matches!(self, GenericKind::Assignment)
    }

    pub fn is_defined_operator(self) -> bool {
        matches!(self, GenericKind::DefinedOperator)
    }

    pub fn is_intrinsic_operator(self) -> bool {
        matches!(
            self,
            GenericKind::Concatenate | GenericKind::Relational(_) | GenericKind::Logical(_) | GenericKind::Numeric
        )
    }

    pub fn as_defined_io(self) -> Option<DefinedIo> {
        match self {
            GenericKind::DefinedIo(io) => Some(io),
            _ => None,
        }
    }
}

impl fmt::Display for GenericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericKind::Name => f.write_str("name"),
            GenericKind::DefinedOperator => f.write_str("defined operator"),
            GenericKind::Assignment => f.write_str("assignment(=)"),
            GenericKind::Concatenate => f.write_str("operator(//)"),
            GenericKind::Relational(op) => write!(f, "operator({op})"),
            GenericKind::Logical(op) => write!(f, "operator({op})"),
            GenericKind::Numeric => f.write_str("numeric operator"),
            GenericKind::DefinedIo(io) => f.write_str(io.as_source()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericDetails {
    pub kind: GenericKind,
    pub specific_procs: Vec<SymbolId>,
    /// Specific procedure with the same name as the generic
    pub specific: Option<SymbolId>,
    /// Derived type with the same name as the generic
    pub derived_type: Option<SymbolId>,
}

impl GenericDetails {
    pub fn new(kind: GenericKind) -> Self {
        Self {
            kind,
            specific_procs: Vec::new(),
            specific: None,
            derived_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DerivedTypeDetails {
    /// Component names in declaration order; the parent component comes first
    pub component_names: Vec<Name>,
    /// Type parameters in the order of the TYPE statement's name list
    pub param_name_order: Vec<SymbolId>,
    /// Type parameters in the order of their declarations
    pub param_decl_order: Vec<SymbolId>,
    /// FINAL subroutines in declaration order
    pub finals: Vec<SymbolId>,
    pub sequence: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeParamAttr {
    Kind,
    Len,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamDetails {
    pub attr: TypeParamAttr,
    pub ty: Option<DeclTypeSpec>,
    pub init: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleDetails {
    pub is_submodule: bool,
    /// Module a submodule descends from
    pub ancestor: Option<ScopeId>,
    /// Direct parent module or submodule of a submodule
    pub parent: Option<ScopeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseDetails {
    pub location: Span,
    pub symbol: SymbolId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UseErrorDetails {
    /// Where each conflicting definition was use-associated from
    pub occurrences: Vec<(Span, SymbolId)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostAssocDetails {
    pub symbol: SymbolId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssocEntityDetails {
    pub selector: Option<Expr>,
    pub ty: Option<DeclTypeSpec>,
    pub shape: ArraySpec,
    /// Rank of a SELECT RANK case
    pub rank: Option<usize>,
    /// Associate name of a SELECT TYPE type guard
    pub is_type_guard: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiscKind {
    None,
    ConstructName,
    ScopeName,
    PassName,
    ComplexPartRe,
    ComplexPartIm,
    KindParamInquiry,
    LenParamInquiry,
    SelectRankAssociateName,
    SelectTypeAssociateName,
    TypeBoundDefinedOp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MiscDetails {
    pub kind: MiscKind,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommonBlockDetails {
    pub objects: Vec<SymbolId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_kind_queries() {
        assert!(GenericKind::Assignment.is_assignment());
        assert!(GenericKind::Relational(RelationalOperator::Lt).is_intrinsic_operator());
        assert!(!GenericKind::DefinedOperator.is_intrinsic_operator());
        assert_eq!(
            GenericKind::DefinedIo(DefinedIo::WriteFormatted).as_defined_io(),
            Some(DefinedIo::WriteFormatted)
        );
        assert_eq!(GenericKind::DefinedIo(DefinedIo::ReadUnformatted).to_string(), "read(unformatted)");
    }
}
