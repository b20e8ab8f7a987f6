//! Syntax tree of program descriptions
//!
//! Only declarations are represented; the loader builds symbols, not code.

use crate::common::Span;
use crate::symbols::{
    Attrs, CudaDataAttr, CudaSubprogramAttrs, DeclTypeSpec, DerivedCategory, GenericKind, ParamValue, ScopeKind,
    TypeParamAttr,
};

/// A name as written, with its location
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub text: String,
    pub span: Span,
}

impl Ident {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self { text: text.into(), span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub units: Vec<Unit>,
}

/// A program unit or subprogram with its body
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub kind: UnitKind,
    pub name: Ident,
    pub prefix: Prefix,
    pub body: Vec<Item>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitKind {
    Module { module_file: bool, intrinsic: bool },
    /// `submodule(ancestor[:parent]) name`
    Submodule { ancestor: Ident, parent: Option<Ident> },
    Program,
    BlockData,
    Subprogram(SubprogramHeader),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubprogramHeader {
    pub is_function: bool,
    /// `None` is an alternate return (`*`)
    pub dummies: Vec<Option<Ident>>,
    pub result: Option<Ident>,
}

/// Prefix of a unit: attributes, BIND(C), CUDA attributes, result type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prefix {
    pub attrs: Attrs,
    pub bind: Option<BindSpec>,
    pub cuda: Option<CudaSubprogramAttrs>,
    pub ty: Option<TypeSpec>,
}

/// `bind(c[, name="..."])`
#[derive(Debug, Clone, PartialEq)]
pub struct BindSpec {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    /// Intrinsic types, TYPE(*) and CLASS(*)
    Decl(DeclTypeSpec),
    Derived {
        category: DerivedCategory,
        name: Ident,
        /// Parameter values, optionally with keywords
        params: Vec<(Option<Ident>, ParamValue)>,
    },
}

/// Shape as written; `:` entries become deferred or assumed shape once the
/// entity's attributes are known
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeSpec {
    Colons(usize),
    AssumedRank,
    AssumedSize(usize),
    Explicit(Vec<Option<i64>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Unit(Unit),
    Use(UseStmt),
    Decl(TypeDecl),
    Procedure(ProcedureDecl),
    /// `save :: a, b`, `external :: f`, or a bare `private`
    AttrStmt { attrs: Attrs, names: Vec<Ident>, span: Span },
    /// Blocks of a COMMON statement with their objects; the blank block has
    /// an empty name
    Common(Vec<(Ident, Vec<Ident>)>),
    Equivalence(Vec<Vec<EquivalenceRef>>),
    /// `(pointer, pointee)` pairs
    CrayPointer(Vec<(Ident, Ident)>),
    StmtFunction { name: Ident, dummies: Vec<Ident> },
    Entry { name: Ident, dummies: Vec<Option<Ident>>, result: Option<Ident> },
    TypeDef(TypeDef),
    Interface(InterfaceBlock),
    Generic(GenericStmt),
    Final(Vec<Ident>),
    Sequence,
    Construct(ConstructBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseStmt {
    pub module: Ident,
    pub only: bool,
    /// `(local, remote)` pairs of the rename or ONLY list
    pub renames: Vec<(Ident, Ident)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeclAttrs {
    pub attrs: Attrs,
    pub shape: Option<ShapeSpec>,
    pub corank: Option<usize>,
    pub cuda: Option<CudaDataAttr>,
    pub type_param: Option<TypeParamAttr>,
    pub bind: Option<BindSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub ty: TypeSpec,
    pub attrs: DeclAttrs,
    pub entities: Vec<EntityDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityDecl {
    pub name: Ident,
    pub shape: Option<ShapeSpec>,
    pub corank: Option<usize>,
    pub init: Option<Initializer>,
    /// `@ offset:size`
    pub storage: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Initializer {
    /// `= expr`, with its value when it is an integer constant
    Value(Option<i64>),
    /// `=> target`
    Pointer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcInterface {
    Name(Ident),
    Type(TypeSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDecl {
    pub interface: Option<ProcInterface>,
    pub attrs: Attrs,
    pub pass_name: Option<Ident>,
    pub entities: Vec<ProcEntityDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcEntityDecl {
    pub name: Ident,
    /// `=> target`: the bound procedure of a binding, or a pointer initializer
    pub target: Option<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: Ident,
    pub attrs: Attrs,
    pub extends: Option<Ident>,
    pub bind: Option<BindSpec>,
    pub params: Vec<Ident>,
    pub body: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceBlock {
    pub is_abstract: bool,
    pub generic: Option<GenericSpec>,
    pub bodies: Vec<Unit>,
    /// `procedure :: a, b` inside a generic interface
    pub procedures: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericSpec {
    /// Name under which the generic is declared, such as `operator(<)`
    pub name: String,
    pub kind: GenericKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericStmt {
    pub access: Attrs,
    pub spec: GenericSpec,
    pub specifics: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceRef {
    pub name: Ident,
    pub subscripts: Vec<i64>,
    pub substring_start: Option<i64>,
    pub span: Span,
}

/// BLOCK, ASSOCIATE and directive constructs that open a scope
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructBlock {
    pub kind: ScopeKind,
    pub associations: Vec<Association>,
    pub body: Vec<Item>,
    pub span: Span,
}

/// `name => selector` of an ASSOCIATE construct
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    pub name: Ident,
    pub selector: Selector,
}

/// `base[(subscripts)][%component...]`
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub base: Ident,
    pub subscripts: usize,
    pub components: Vec<Ident>,
}
