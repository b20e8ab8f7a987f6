//! Operand category rules for intrinsic operations and assignment

use crate::evaluate::{DynamicType, Expr, RelationalOperator, Tristate, TypeCategory, are_conformable};
use crate::semantics::SemanticsContext;
use crate::symbols::SymbolTable;

/// Whether an assignment with these operands is a defined assignment.
///
/// `Maybe` means both sides may be the same derived type, where either an
/// intrinsic or a defined assignment may apply. An untyped side yields `No`.
pub fn is_defined_assignment(
    table: &SymbolTable,
    lhs_type: Option<&DynamicType>,
    lhs_rank: usize,
    rhs_type: Option<&DynamicType>,
    rhs_rank: usize,
) -> Tristate {
    let (Some(lhs), Some(rhs)) = (lhs_type, rhs_type) else {
        return Tristate::No;
    };
    let (lhs_category, rhs_category) = (lhs.category, rhs.category);
    if rhs_rank > 0 && lhs_rank != rhs_rank {
        return Tristate::Yes;
    }
    if lhs_category != TypeCategory::Derived {
        let defined = lhs_category != rhs_category
            && (!lhs_category.is_numeric()
                || !rhs_category.is_numeric()
                || lhs_category == TypeCategory::Unsigned
                || rhs_category == TypeCategory::Unsigned);
        return defined.into();
    }
    if lhs.is_tk_compatible_with(rhs, table) {
        Tristate::Maybe
    } else {
        Tristate::Yes
    }
}

/// Whether a relational operation is intrinsic for these operands
pub fn is_intrinsic_relational(
    operator: RelationalOperator,
    type0: &DynamicType,
    rank0: usize,
    type1: &DynamicType,
    rank1: usize,
) -> bool {
    if !are_conformable(rank0, rank1) {
        return false;
    }
    let (category0, category1) = (type0.category, type1.category);
    if category0 == TypeCategory::Unsigned || category1 == TypeCategory::Unsigned {
        category0 == category1
    } else if category0.is_numeric() && category1.is_numeric() {
        // ordering is not defined for complex values
        operator.is_equality() || (category0 != TypeCategory::Complex && category1 != TypeCategory::Complex)
    } else {
        category0 == TypeCategory::Character && category1 == TypeCategory::Character
    }
}

/// Unary numeric operation
pub fn is_intrinsic_numeric(type0: &DynamicType) -> bool {
    type0.category.is_numeric()
}

pub fn is_intrinsic_numeric_binary(type0: &DynamicType, rank0: usize, type1: &DynamicType, rank1: usize) -> bool {
    are_conformable(rank0, rank1) && type0.category.is_numeric() && type1.category.is_numeric()
}

/// Unary logical operation
pub fn is_intrinsic_logical(type0: &DynamicType) -> bool {
    type0.category == TypeCategory::Logical
}

pub fn is_intrinsic_logical_binary(type0: &DynamicType, rank0: usize, type1: &DynamicType, rank1: usize) -> bool {
    are_conformable(rank0, rank1) && type0.category == TypeCategory::Logical && type1.category == TypeCategory::Logical
}

/// Concatenation requires character operands of the same kind
pub fn is_intrinsic_concat(type0: &DynamicType, rank0: usize, type1: &DynamicType, rank1: usize) -> bool {
    are_conformable(rank0, rank1)
        && type0.category == TypeCategory::Character
        && type1.category == TypeCategory::Character
        && type0.kind == type1.kind
}

pub fn expr_has_type_category(table: &SymbolTable, expr: &Expr, category: TypeCategory) -> bool {
    expr.get_type(table).is_some_and(|ty| ty.category == category)
}

/// Whether an expression has an intrinsic type of default kind
pub fn expr_type_kind_is_default(context: &SemanticsContext, expr: &Expr) -> bool {
    expr.get_type(context.table()).is_some_and(|ty| {
        ty.category != TypeCategory::Derived && ty.kind == context.default_kind(ty.category)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_str;
    use crate::semantics::LanguageFeatures;
    use crate::symbols::DeclTypeSpec;
    use crate::tools::testing::symbol_named;

    fn intrinsic(category: TypeCategory) -> DynamicType {
        DynamicType::intrinsic(category, 4)
    }

    #[test]
    fn test_relational_rules() {
        use RelationalOperator::{Eq, Lt, Ne};
        let integer = intrinsic(TypeCategory::Integer);
        let real = intrinsic(TypeCategory::Real);
        let complex = intrinsic(TypeCategory::Complex);
        let character = DynamicType::intrinsic(TypeCategory::Character, 1);
        let logical = intrinsic(TypeCategory::Logical);
        let unsigned = intrinsic(TypeCategory::Unsigned);

        assert!(is_intrinsic_relational(Lt, &integer, 0, &real, 0));
        assert!(is_intrinsic_relational(Eq, &complex, 1, &integer, 0));
        assert!(is_intrinsic_relational(Ne, &real, 0, &complex, 0));
        assert!(!is_intrinsic_relational(Lt, &complex, 0, &real, 0));
        assert!(!is_intrinsic_relational(Lt, &real, 0, &complex, 0));
        assert!(!is_intrinsic_relational(Eq, &integer, 1, &real, 2));
        assert!(is_intrinsic_relational(Lt, &character, 0, &character, 0));
        assert!(!is_intrinsic_relational(Eq, &logical, 0, &logical, 0));
        assert!(!is_intrinsic_relational(Eq, &unsigned, 0, &integer, 0));
        assert!(is_intrinsic_relational(Lt, &unsigned, 0, &unsigned, 0));
    }

    #[test]
    fn test_unary_and_binary_operations() {
        let integer = intrinsic(TypeCategory::Integer);
        let logical = intrinsic(TypeCategory::Logical);
        let narrow = DynamicType::intrinsic(TypeCategory::Character, 1);
        let wide = DynamicType::intrinsic(TypeCategory::Character, 4);

        assert!(is_intrinsic_numeric(&integer));
        assert!(!is_intrinsic_numeric(&logical));
        assert!(is_intrinsic_numeric_binary(&integer, 2, &integer, 0));
        assert!(!is_intrinsic_numeric_binary(&integer, 2, &integer, 1));
        assert!(is_intrinsic_logical(&logical));
        assert!(is_intrinsic_logical_binary(&logical, 0, &logical, 3));
        assert!(!is_intrinsic_logical_binary(&logical, 0, &integer, 0));
        assert!(is_intrinsic_concat(&narrow, 0, &narrow, 0));
        assert!(!is_intrinsic_concat(&narrow, 0, &wide, 0));
    }

    #[test]
    fn test_defined_assignment() {
        let table = load_str(
            "module m {
               type :: t { integer :: i }
               type :: u { integer :: j }
               type(t) :: a; type(t) :: b; type(u) :: c
             }",
        )
        .unwrap();
        let dynamic = |name| DynamicType::from_decl(table.symbol_type(symbol_named(&table, name)).unwrap());
        let (a, b, c) = (dynamic("a"), dynamic("b"), dynamic("c"));
        let integer = intrinsic(TypeCategory::Integer);
        let real = intrinsic(TypeCategory::Real);
        let logical = intrinsic(TypeCategory::Logical);
        let unsigned = intrinsic(TypeCategory::Unsigned);

        assert_eq!(is_defined_assignment(&table, Some(&a), 0, Some(&b), 0), Tristate::Maybe);
        assert_eq!(is_defined_assignment(&table, Some(&a), 0, Some(&c), 0), Tristate::Yes);
        assert_eq!(is_defined_assignment(&table, Some(&a), 0, Some(&b), 1), Tristate::Yes);
        assert_eq!(is_defined_assignment(&table, Some(&integer), 0, Some(&real), 0), Tristate::No);
        assert_eq!(is_defined_assignment(&table, Some(&integer), 1, Some(&real), 0), Tristate::No);
        assert_eq!(is_defined_assignment(&table, Some(&integer), 0, Some(&logical), 0), Tristate::Yes);
        assert_eq!(is_defined_assignment(&table, Some(&integer), 0, Some(&unsigned), 0), Tristate::Yes);
        assert_eq!(is_defined_assignment(&table, Some(&logical), 0, Some(&logical), 0), Tristate::No);
        assert_eq!(is_defined_assignment(&table, Some(&integer), 0, Some(&a), 0), Tristate::Yes);
        assert_eq!(is_defined_assignment(&table, None, 0, Some(&a), 0), Tristate::No);
    }

    #[test]
    fn test_expression_categories() {
        let context = crate::tools::testing::context_for(
            "program p { integer :: i; integer(8) :: j; real :: x }",
            LanguageFeatures::default(),
        );
        let table = context.table();
        let i = Expr::symbol(symbol_named(table, "i"));
        let j = Expr::symbol(symbol_named(table, "j"));
        let x = Expr::symbol(symbol_named(table, "x"));

        assert!(expr_has_type_category(table, &i, TypeCategory::Integer));
        assert!(!expr_has_type_category(table, &x, TypeCategory::Integer));
        assert!(expr_type_kind_is_default(&context, &i));
        assert!(!expr_type_kind_is_default(&context, &j));
        assert!(expr_type_kind_is_default(&context, &x));
        assert!(matches!(table.symbol_type(symbol_named(table, "j")), Some(DeclTypeSpec::Intrinsic { kind: 8, .. })));
    }
}
