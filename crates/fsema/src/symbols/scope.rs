//! Scopes

use std::collections::HashMap;

use crate::common::Span;

use super::{DerivedTypeId, Name, ScopeId, SymbolId};

/// Kind of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    /// Container of the intrinsic modules
    IntrinsicModules,
    /// Module or submodule
    Module,
    MainProgram,
    Subprogram,
    BlockData,
    DerivedType,
    BlockConstruct,
    Forall,
    OtherConstruct,
    OpenAccConstruct,
    OpenMpConstruct,
    ImpliedDos,
    OtherClause,
}

impl ScopeKind {
    /// Scope of a program unit or subprogram
    pub fn is_program_unit(self) -> bool {
        matches!(
            self,
            ScopeKind::Module | ScopeKind::MainProgram | ScopeKind::Subprogram | ScopeKind::BlockData
        )
    }
}

/// One object of an EQUIVALENCE set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceObject {
    pub symbol: SymbolId,
    pub subscripts: Vec<i64>,
    pub substring_start: Option<i64>,
    pub source: Span,
}

impl EquivalenceObject {
    pub fn new(symbol: SymbolId, source: Span) -> Self {
        Self {
            symbol,
            subscripts: Vec::new(),
            substring_start: None,
            source,
        }
    }
}

pub type EquivalenceSet = Vec<EquivalenceObject>;

/// A node of the scope tree
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub(super) parent: Option<ScopeId>,
    /// Symbol that defines this scope, if any
    pub symbol: Option<SymbolId>,
    pub(super) names: HashMap<Name, SymbolId>,
    /// Owned symbols in insertion order
    pub(super) symbols: Vec<SymbolId>,
    pub(super) children: Vec<ScopeId>,
    pub equivalence_sets: Vec<EquivalenceSet>,
    /// Cray pointees and the pointers they are associated with
    pub cray_pointers: Vec<(Name, SymbolId)>,
    pub(super) common_blocks: HashMap<Name, SymbolId>,
    /// Instantiation this derived-type scope holds the components of
    pub derived_type_spec: Option<DerivedTypeId>,
    /// Instantiations of the derived types declared in this scope
    pub(super) instantiations: Vec<DerivedTypeId>,
    /// Scope was read from a module file
    pub is_module_file: bool,
    pub span: Span,
}

impl Scope {
    pub(super) fn new(kind: ScopeKind, parent: Option<ScopeId>, symbol: Option<SymbolId>) -> Self {
        Self {
            kind,
            parent,
            symbol,
            names: HashMap::new(),
            symbols: Vec::new(),
            children: Vec::new(),
            equivalence_sets: Vec::new(),
            cray_pointers: Vec::new(),
            common_blocks: HashMap::new(),
            derived_type_spec: None,
            instantiations: Vec::new(),
            is_module_file: false,
            span: Span::default(),
        }
    }

    /// Local lookup, without walking to the host
    pub fn find(&self, name: Name) -> Option<SymbolId> {
        self.names.get(&name).copied()
    }

    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    pub fn find_common_block(&self, name: Name) -> Option<SymbolId> {
        self.common_blocks.get(&name).copied()
    }

    /// Common blocks declared in this scope, in no particular order
    pub fn common_blocks(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.common_blocks.values().copied()
    }

    pub fn instantiations(&self) -> &[DerivedTypeId] {
        &self.instantiations
    }

    pub fn is_derived_type(&self) -> bool {
        self.kind == ScopeKind::DerivedType
    }

    pub fn is_global(&self) -> bool {
        self.kind == ScopeKind::Global
    }
}
