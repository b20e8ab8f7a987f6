//! Dynamic types and type identity

use std::collections::HashSet;
use std::fmt;

use crate::symbols::{Attrs, DeclTypeSpec, DerivedTypeId, SymbolFlags, SymbolId, SymbolTable};

/// Type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeCategory {
    Integer,
    Unsigned,
    Real,
    Complex,
    Character,
    Logical,
    Derived,
}

impl TypeCategory {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeCategory::Integer | TypeCategory::Unsigned | TypeCategory::Real | TypeCategory::Complex
        )
    }

    /// Parse an intrinsic type keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let category = match keyword {
            "integer" => TypeCategory::Integer,
            "unsigned" => TypeCategory::Unsigned,
            "real" => TypeCategory::Real,
            "complex" => TypeCategory::Complex,
            "character" => TypeCategory::Character,
            "logical" => TypeCategory::Logical,
            _ => return None,
        };
        Some(category)
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeCategory::Integer => "INTEGER",
            TypeCategory::Unsigned => "UNSIGNED",
            TypeCategory::Real => "REAL",
            TypeCategory::Complex => "COMPLEX",
            TypeCategory::Character => "CHARACTER",
            TypeCategory::Logical => "LOGICAL",
            TypeCategory::Derived => "TYPE",
        };
        f.write_str(s)
    }
}

/// Category, kind and derived-type identity of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DynamicType {
    pub category: TypeCategory,
    /// Kind of an intrinsic type; zero for derived types
    pub kind: u8,
    pub derived: Option<DerivedTypeId>,
    /// CLASS(t) or CLASS(*)
    pub polymorphic: bool,
    /// TYPE(*)
    pub assumed: bool,
}

impl DynamicType {
    pub fn intrinsic(category: TypeCategory, kind: u8) -> Self {
        Self {
            category,
            kind,
            derived: None,
            polymorphic: false,
            assumed: false,
        }
    }

    pub fn derived(spec: DerivedTypeId, polymorphic: bool) -> Self {
        Self {
            category: TypeCategory::Derived,
            kind: 0,
            derived: Some(spec),
            polymorphic,
            assumed: false,
        }
    }

    /// CLASS(*)
    pub fn unlimited_polymorphic() -> Self {
        Self {
            category: TypeCategory::Derived,
            kind: 0,
            derived: None,
            polymorphic: true,
            assumed: false,
        }
    }

    /// TYPE(*)
    pub fn assumed_type() -> Self {
        Self {
            category: TypeCategory::Derived,
            kind: 0,
            derived: None,
            polymorphic: false,
            assumed: true,
        }
    }

    pub fn from_decl(decl: &DeclTypeSpec) -> Self {
        match decl {
            DeclTypeSpec::Intrinsic { category, kind } => Self::intrinsic(*category, *kind),
            DeclTypeSpec::Character { kind, .. } => Self::intrinsic(TypeCategory::Character, *kind),
            DeclTypeSpec::TypeDerived(spec) => Self::derived(*spec, false),
            DeclTypeSpec::ClassDerived(spec) => Self::derived(*spec, true),
            DeclTypeSpec::TypeStar => Self::assumed_type(),
            DeclTypeSpec::ClassStar => Self::unlimited_polymorphic(),
        }
    }

    pub fn is_unlimited_polymorphic(&self) -> bool {
        self.polymorphic && self.derived.is_none()
    }

    /// Whether a value of type `other` may be associated with an entity of
    /// this type, ignoring length parameters
    pub fn is_tk_compatible_with(&self, other: &DynamicType, table: &SymbolTable) -> bool {
        if self.is_unlimited_polymorphic() || self.assumed {
            return true;
        }
        if other.is_unlimited_polymorphic() || other.assumed || self.category != other.category {
            return false;
        }
        if self.category != TypeCategory::Derived {
            return self.kind == other.kind;
        }
        match (self.derived, other.derived) {
            (Some(mine), Some(theirs)) => {
                are_same_derived_type(table, mine, theirs) || (self.polymorphic && extends(table, theirs, mine))
            }
            _ => false,
        }
    }
}

/// Ranks are conformable when equal or when either operand is a scalar
pub fn are_conformable(rank0: usize, rank1: usize) -> bool {
    rank0 == rank1 || rank0 == 0 || rank1 == 0
}

/// Whether `derived` is `base` or a type extended from it
pub fn extends(table: &SymbolTable, derived: DerivedTypeId, base: DerivedTypeId) -> bool {
    let mut current = Some(derived);
    while let Some(spec) = current {
        if are_same_derived_type(table, spec, base) {
            return true;
        }
        current = parent_type_spec(table, spec);
    }
    false
}

/// Instantiation of the parent type of `spec`
pub(crate) fn parent_type_spec(table: &SymbolTable, spec: DerivedTypeId) -> Option<DerivedTypeId> {
    let scope = table.derived_scope(spec)?;
    table
        .scope(scope)
        .symbols()
        .iter()
        .copied()
        .find(|&component| table.symbol(component).test(SymbolFlags::PARENT_COMP))
        .and_then(|component| table.symbol_derived_type(component))
}

/// Whether two instantiations denote the same type.
///
/// Distinct type definitions are the same type when both are SEQUENCE
/// types, or both BIND(C) types, with the same name and structurally
/// identical components.
pub fn are_same_derived_type(table: &SymbolTable, x: DerivedTypeId, y: DerivedTypeId) -> bool {
    let mut in_progress = HashSet::new();
    same_spec(table, x, y, &mut in_progress)
}

fn same_spec(
    table: &SymbolTable,
    x: DerivedTypeId,
    y: DerivedTypeId,
    in_progress: &mut HashSet<(SymbolId, SymbolId)>,
) -> bool {
    if x == y {
        return true;
    }
    let (xs, ys) = (table.derived(x), table.derived(y));
    same_type_symbol(table, xs.type_symbol, ys.type_symbol, in_progress) && xs.has_same_parameters(ys)
}

fn same_type_symbol(
    table: &SymbolTable,
    x: SymbolId,
    y: SymbolId,
    in_progress: &mut HashSet<(SymbolId, SymbolId)>,
) -> bool {
    let (x, y) = (table.ultimate(x), table.ultimate(y));
    if x == y {
        return true;
    }
    // Already being compared further up: assume equal
    if !in_progress.insert((x, y)) {
        return true;
    }
    let (xsym, ysym) = (table.symbol(x), table.symbol(y));
    if xsym.name != ysym.name {
        return false;
    }
    let (Some(xd), Some(yd)) = (xsym.details.as_derived_type(), ysym.details.as_derived_type()) else {
        return false;
    };
    let structural = (xd.sequence && yd.sequence) || (xsym.has(Attrs::BIND_C) && ysym.has(Attrs::BIND_C));
    if !structural || xd.component_names != yd.component_names {
        return false;
    }
    let (Some(xscope), Some(yscope)) = (xsym.scope, ysym.scope) else {
        return false;
    };
    xd.component_names.iter().all(|&name| {
        match (table.scope(xscope).find(name), table.scope(yscope).find(name)) {
            (Some(xc), Some(yc)) => same_component(table, xc, yc, in_progress),
            _ => false,
        }
    })
}

fn same_component(
    table: &SymbolTable,
    x: SymbolId,
    y: SymbolId,
    in_progress: &mut HashSet<(SymbolId, SymbolId)>,
) -> bool {
    let relevant = Attrs::POINTER | Attrs::ALLOCATABLE;
    if table.symbol(x).attrs & relevant != table.symbol(y).attrs & relevant {
        return false;
    }
    if table.shape(x) != table.shape(y) {
        return false;
    }
    match (table.symbol_type(x), table.symbol_type(y)) {
        (None, None) => true,
        (Some(xt), Some(yt)) => match (xt.as_derived(), yt.as_derived()) {
            (Some(xs), Some(ys)) => {
                xt.derived_category() == yt.derived_category() && same_spec(table, xs, ys, in_progress)
            }
            _ => xt == yt,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_str;

    #[test]
    fn test_conformable() {
        assert!(are_conformable(2, 2));
        assert!(are_conformable(0, 3));
        assert!(!are_conformable(1, 2));
    }

    #[test]
    fn test_sequence_types_are_structurally_same() {
        let table = load_str(
            "module a { type :: pt { sequence; integer :: x; real :: y } type(pt) :: p }
             module b { type :: pt { sequence; integer :: x; real :: y } type(pt) :: q }
             module c { type :: pt { integer :: x; real :: y } type(pt) :: r }",
        )
        .unwrap();
        let ty = |name: &str| {
            let name = table.lookup_name(name).unwrap();
            let symbol = table.symbol_ids().find(|&id| table.symbol(id).name == name).unwrap();
            table.symbol_derived_type(symbol).unwrap()
        };
        assert!(are_same_derived_type(&table, ty("p"), ty("q")));
        assert!(!are_same_derived_type(&table, ty("p"), ty("r")));
    }

    #[test]
    fn test_class_is_compatible_with_extension() {
        let table = load_str(
            "module m {
               type :: base { integer :: i }
               type, extends(base) :: child { real :: r }
               class(base), pointer :: b
               type(child) :: c
             }",
        )
        .unwrap();
        let ty = |name: &str| {
            let name = table.lookup_name(name).unwrap();
            let symbol = table.symbol_ids().find(|&id| table.symbol(id).name == name).unwrap();
            DynamicType::from_decl(table.symbol_type(symbol).unwrap())
        };
        let base = ty("b");
        let child = ty("c");
        assert!(base.is_tk_compatible_with(&child, &table));
        assert!(!child.is_tk_compatible_with(&base, &table));
        assert!(DynamicType::unlimited_polymorphic().is_tk_compatible_with(&child, &table));
        let int4 = DynamicType::intrinsic(TypeCategory::Integer, 4);
        assert!(!int4.is_tk_compatible_with(&DynamicType::intrinsic(TypeCategory::Integer, 8), &table));
    }
}
