//! Declared types

use crate::evaluate::TypeCategory;

use super::{DerivedTypeId, Name, ScopeId, SymbolId};

/// Value of a type parameter or a character length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamValue {
    Explicit(i64),
    /// Specification expression that is not a constant
    NonConstant,
    /// `*`
    Assumed,
    /// `:`
    Deferred,
}

impl ParamValue {
    pub fn is_explicit(&self) -> bool {
        matches!(self, ParamValue::Explicit(_) | ParamValue::NonConstant)
    }

    pub fn is_assumed(&self) -> bool {
        matches!(self, ParamValue::Assumed)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, ParamValue::Deferred)
    }

    pub fn constant(&self) -> Option<i64> {
        match self {
            ParamValue::Explicit(value) => Some(*value),
            _ => None,
        }
    }
}

/// Whether a derived type is declared with TYPE(t) or CLASS(t)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedCategory {
    Type,
    Class,
}

/// Type of a declared entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclTypeSpec {
    /// INTEGER, UNSIGNED, REAL, COMPLEX or LOGICAL
    Intrinsic { category: TypeCategory, kind: u8 },
    Character { kind: u8, length: ParamValue },
    TypeDerived(DerivedTypeId),
    ClassDerived(DerivedTypeId),
    /// TYPE(*)
    TypeStar,
    /// CLASS(*)
    ClassStar,
}

impl DeclTypeSpec {
    pub fn intrinsic(category: TypeCategory, kind: u8) -> Self {
        if category == TypeCategory::Character {
            DeclTypeSpec::Character { kind, length: ParamValue::Explicit(1) }
        } else {
            DeclTypeSpec::Intrinsic { category, kind }
        }
    }

    pub fn derived(category: DerivedCategory, spec: DerivedTypeId) -> Self {
        match category {
            DerivedCategory::Type => DeclTypeSpec::TypeDerived(spec),
            DerivedCategory::Class => DeclTypeSpec::ClassDerived(spec),
        }
    }

    /// Category of an intrinsic or derived type; `None` for TYPE(*) and CLASS(*)
    pub fn category(&self) -> Option<TypeCategory> {
        match self {
            DeclTypeSpec::Intrinsic { category, .. } => Some(*category),
            DeclTypeSpec::Character { .. } => Some(TypeCategory::Character),
            DeclTypeSpec::TypeDerived(_) | DeclTypeSpec::ClassDerived(_) => Some(TypeCategory::Derived),
            DeclTypeSpec::TypeStar | DeclTypeSpec::ClassStar => None,
        }
    }

    pub fn as_derived(&self) -> Option<DerivedTypeId> {
        match self {
            DeclTypeSpec::TypeDerived(id) | DeclTypeSpec::ClassDerived(id) => Some(*id),
            _ => None,
        }
    }

    pub fn derived_category(&self) -> Option<DerivedCategory> {
        match self {
            DeclTypeSpec::TypeDerived(_) => Some(DerivedCategory::Type),
            DeclTypeSpec::ClassDerived(_) => Some(DerivedCategory::Class),
            _ => None,
        }
    }

    pub fn is_intrinsic(&self) -> bool {
        matches!(self, DeclTypeSpec::Intrinsic { .. } | DeclTypeSpec::Character { .. })
    }

    pub fn is_character(&self) -> bool {
        matches!(self, DeclTypeSpec::Character { .. })
    }

    pub fn character_length(&self) -> Option<ParamValue> {
        match self {
            DeclTypeSpec::Character { length, .. } => Some(*length),
            _ => None,
        }
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(self, DeclTypeSpec::ClassDerived(_) | DeclTypeSpec::ClassStar)
    }

    pub fn is_unlimited_polymorphic(&self) -> bool {
        matches!(self, DeclTypeSpec::ClassStar)
    }

    pub fn is_assumed_type(&self) -> bool {
        matches!(self, DeclTypeSpec::TypeStar)
    }
}

/// An instantiation of a derived type with concrete parameter values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedTypeSpec {
    pub type_symbol: SymbolId,
    /// Parameter values in declaration order
    pub parameters: Vec<(Name, ParamValue)>,
    /// Scope holding the components of this instantiation
    pub scope: Option<ScopeId>,
}

impl DerivedTypeSpec {
    pub fn new(type_symbol: SymbolId) -> Self {
        Self {
            type_symbol,
            parameters: Vec::new(),
            scope: None,
        }
    }

    pub fn with_parameter(mut self, name: Name, value: ParamValue) -> Self {
        self.parameters.push((name, value));
        self
    }

    pub fn parameter(&self, name: Name) -> Option<ParamValue> {
        self.parameters
            .iter()
            .find(|(param, _)| *param == name)
            .map(|(_, value)| *value)
    }

    /// Same type symbol and the same parameter values, in any order
    pub fn has_same_parameters(&self, other: &DerivedTypeSpec) -> bool {
        self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .all(|(name, value)| other.parameter(*name) == Some(*value))
    }
}

/// Declared shape of an entity
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArraySpec {
    #[default]
    Scalar,
    /// Explicit bounds; `None` marks an extent that is not a constant
    Explicit(Vec<Option<i64>>),
    /// `(:, :)` for allocatables and pointers
    Deferred(usize),
    /// `(:, :)` for dummy arguments
    AssumedShape(usize),
    /// `(n, *)`
    AssumedSize(usize),
    /// `(..)`
    AssumedRank,
}

impl ArraySpec {
    pub fn rank(&self) -> usize {
        match self {
            ArraySpec::Scalar | ArraySpec::AssumedRank => 0,
            ArraySpec::Explicit(extents) => extents.len(),
            ArraySpec::Deferred(rank) | ArraySpec::AssumedShape(rank) | ArraySpec::AssumedSize(rank) => *rank,
        }
    }

    pub fn is_assumed_rank(&self) -> bool {
        matches!(self, ArraySpec::AssumedRank)
    }

    /// Explicit shape with at least one extent that is not a constant
    pub fn has_non_constant_extent(&self) -> bool {
        matches!(self, ArraySpec::Explicit(extents) if extents.iter().any(Option::is_none))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_ranks() {
        assert_eq!(ArraySpec::Scalar.rank(), 0);
        assert_eq!(ArraySpec::Explicit(vec![Some(3), None]).rank(), 2);
        assert_eq!(ArraySpec::Deferred(1).rank(), 1);
        assert_eq!(ArraySpec::AssumedRank.rank(), 0);
        assert!(ArraySpec::Explicit(vec![None]).has_non_constant_extent());
        assert!(!ArraySpec::Explicit(vec![Some(4)]).has_non_constant_extent());
    }

    #[test]
    fn test_character_via_intrinsic_constructor() {
        let ty = DeclTypeSpec::intrinsic(TypeCategory::Character, 1);
        assert!(ty.is_character());
        assert_eq!(ty.category(), Some(TypeCategory::Character));
        assert_eq!(DeclTypeSpec::ClassStar.category(), None);
        assert!(DeclTypeSpec::ClassStar.is_unlimited_polymorphic());
    }
}
