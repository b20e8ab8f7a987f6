//! Spellings of operators and entities

use crate::common::deref;
use crate::evaluate::{LogicalOperator, RelationalOperator};
use crate::parse_tree::{Construct, Name};
use crate::semantics::LanguageFeatures;
use crate::symbols::{ArraySpec, SymbolId, SymbolTable};

/// Object name of the blank common block
pub const BLANK_COMMON_OBJECT_NAME: &str = "__BLNK__";

/// `.foo.`
pub fn is_defined_operator(name: &str) -> bool {
    name.starts_with('.') && name.ends_with('.')
}

/// Name of a generic as shown in messages
pub fn make_op_name(name: &str) -> String {
    if is_defined_operator(name) {
        format!("OPERATOR({name})")
    } else if name.starts_with("operator(") {
        name.to_ascii_uppercase()
    } else {
        name.to_string()
    }
}

fn logical_spellings(features: LanguageFeatures, op: LogicalOperator) -> Vec<&'static str> {
    let mut spellings = vec![op.as_dotted()];
    match op {
        LogicalOperator::And if features.logical_abbreviations => spellings.push(".a."),
        LogicalOperator::Or if features.logical_abbreviations => spellings.push(".o."),
        LogicalOperator::Not if features.logical_abbreviations => spellings.push(".n."),
        LogicalOperator::Neqv => {
            if features.xor_operator {
                spellings.push(".xor.");
            }
            if features.logical_abbreviations {
                spellings.push(".x.");
            }
        }
        _ => {}
    }
    spellings
}

fn operator_names<'s>(spellings: impl IntoIterator<Item = &'s str>) -> Vec<String> {
    spellings.into_iter().map(|spelling| format!("operator({spelling})")).collect()
}

/// Every name under which a generic may be declared.
///
/// An intrinsic operator generic such as `operator(.lt.)` has one name per
/// spelling of the operator (`operator(<)`); any other name stands alone.
pub fn get_all_names(features: LanguageFeatures, name: &str) -> Vec<String> {
    if name.starts_with("operator(") && name.ends_with(')') {
        let logical = LogicalOperator::ALL
            .into_iter()
            .map(|op| operator_names(logical_spellings(features, op)));
        let relational = RelationalOperator::ALL
            .into_iter()
            .map(|op| operator_names([op.as_dotted(), op.as_symbol()]));
        if let Some(names) = logical.chain(relational).find(|names| names.iter().any(|n| n == name)) {
            return names;
        }
    }
    vec![name.to_string()]
}

/// `ancestor:name` for a submodule, the plain name for a module
pub fn get_module_or_submodule_name(table: &SymbolTable, module: SymbolId) -> String {
    let details = deref(table.symbol(module).details.as_module(), "module details");
    let name = table.symbol_name(module);
    match details.ancestor.and_then(|ancestor| table.scope(ancestor).symbol) {
        Some(ancestor) => format!("{}:{name}", table.symbol_name(ancestor)),
        None => name.to_string(),
    }
}

/// Link name of a common block
pub fn get_common_block_object_name(table: &SymbolTable, common: SymbolId, underscoring: bool) -> String {
    let symbol = table.symbol(common);
    if let Some(bind_name) = &symbol.bind_name {
        return bind_name.clone();
    }
    let name = table.symbol_name(common);
    if name.is_empty() {
        BLANK_COMMON_OBJECT_NAME.to_string()
    } else if underscoring {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

pub fn maybe_get_node_name(construct: &Construct) -> Option<&Name> {
    construct.name.as_ref()
}

/// Explicit shape from constant extents; `None` when an extent is unknown
/// or negative
pub fn to_array_spec(extents: &[Option<i64>]) -> Option<ArraySpec> {
    extents
        .iter()
        .all(|extent| extent.is_some_and(|extent| extent >= 0))
        .then(|| ArraySpec::Explicit(extents.to_vec()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::Span;
    use crate::loader::load_str;
    use crate::parse_tree::{ConstructKind, Statement};
    use crate::tools::testing::symbol_named;

    #[test]
    fn test_operator_names() {
        assert!(is_defined_operator(".foo."));
        assert!(!is_defined_operator("foo"));
        assert_eq!(make_op_name(".foo."), "OPERATOR(.foo.)");
        assert_eq!(make_op_name("operator(+)"), "OPERATOR(+)");
        assert_eq!(make_op_name("assign"), "assign");
    }

    #[test]
    fn test_relational_aliases() {
        let names = get_all_names(LanguageFeatures::default(), "operator(<)");
        assert_eq!(names, vec!["operator(.lt.)", "operator(<)"]);
        assert_eq!(get_all_names(LanguageFeatures::default(), "operator(.ne.)"), vec!["operator(.ne.)", "operator(/=)"]);
    }

    #[test]
    fn test_logical_aliases_follow_features() {
        let plain = LanguageFeatures::default();
        assert_eq!(get_all_names(plain, "operator(.neqv.)"), vec!["operator(.neqv.)"]);
        assert_eq!(get_all_names(plain, "operator(.xor.)"), vec!["operator(.xor.)"]);

        let extended = LanguageFeatures { logical_abbreviations: true, xor_operator: true, ..plain };
        assert_eq!(
            get_all_names(extended, "operator(.xor.)"),
            vec!["operator(.neqv.)", "operator(.xor.)", "operator(.x.)"]
        );
        assert_eq!(get_all_names(extended, "operator(.a.)"), vec!["operator(.and.)", "operator(.a.)"]);
    }

    #[test]
    fn test_other_names_stand_alone() {
        assert_eq!(get_all_names(LanguageFeatures::default(), "operator(.foo.)"), vec!["operator(.foo.)"]);
        assert_eq!(get_all_names(LanguageFeatures::default(), "swap"), vec!["swap"]);
    }

    #[test]
    fn test_module_names() {
        let table = load_str("module m { } submodule(m) s { }").unwrap();
        assert_eq!(get_module_or_submodule_name(&table, symbol_named(&table, "m")), "m");
        assert_eq!(get_module_or_submodule_name(&table, symbol_named(&table, "s")), "m:s");
    }

    #[test]
    fn test_common_block_names() {
        let table = load_str(
            "program main {
               integer :: a, b
               common /blk/ a
               common // b
             }",
        )
        .unwrap();
        let main = table.symbol(symbol_named(&table, "main")).scope.unwrap();
        let blk = table.scope(main).find_common_block(table.lookup_name("blk").unwrap()).unwrap();
        let blank = table.scope(main).find_common_block(table.lookup_name("").unwrap()).unwrap();
        assert_eq!(get_common_block_object_name(&table, blk, true), "blk_");
        assert_eq!(get_common_block_object_name(&table, blk, false), "blk");
        assert_eq!(get_common_block_object_name(&table, blank, true), BLANK_COMMON_OBJECT_NAME);
    }

    #[test]
    fn test_bind_name_wins() {
        let mut table = load_str("program main { integer :: a \n common /blk/ a }").unwrap();
        let main = table.symbol(symbol_named(&table, "main")).scope.unwrap();
        let blk = table.scope(main).find_common_block(table.lookup_name("blk").unwrap()).unwrap();
        table.symbol_mut(blk).bind_name = Some("c_blk".to_string());
        assert_eq!(get_common_block_object_name(&table, blk, true), "c_blk");
    }

    #[test]
    fn test_node_names_and_shapes() {
        let construct = Construct {
            kind: ConstructKind::Block,
            name: Some(Name::new(Span::new(0, 5), "outer", None)),
            statement: Statement::new(Span::new(0, 12), ()),
            body: Vec::new(),
        };
        assert_eq!(maybe_get_node_name(&construct).map(|name| name.text.as_str()), Some("outer"));
        assert_eq!(to_array_spec(&[Some(2), Some(3)]), Some(ArraySpec::Explicit(vec![Some(2), Some(3)])));
        assert_eq!(to_array_spec(&[Some(2), None]), None);
        assert_eq!(to_array_spec(&[Some(-1)]), None);
    }
}
