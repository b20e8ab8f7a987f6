//! Storage association through EQUIVALENCE

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::symbols::{ScopeId, SymbolId, SymbolTable};

use super::predicates::find_common_block_containing;

/// Groups of the equivalenced symbols of `scope` whose storage overlaps.
///
/// Symbols are ordered by common block (local storage first, then blocks
/// in source order), ascending offset and descending size; a group ends at
/// a gap in storage or a change of common block.
pub fn get_storage_associations(table: &SymbolTable, scope: ScopeId) -> Vec<Vec<SymbolId>> {
    let mut seen = HashSet::new();
    let mut associated: Vec<SymbolId> = table
        .scope(scope)
        .equivalence_sets
        .iter()
        .flatten()
        .map(|object| object.symbol)
        .filter(|&symbol| seen.insert(symbol))
        .collect();
    associated.sort_by_key(|&symbol| {
        let sym = table.symbol(symbol);
        let block = find_common_block_containing(table, symbol).map(|block| table.symbol(block).span.start);
        (block, sym.offset, Reverse(sym.size), sym.span.start)
    });

    let mut groups: Vec<Vec<SymbolId>> = Vec::new();
    let mut limit = 0;
    let mut current_common = None;
    for symbol in associated {
        let this_common = find_common_block_containing(table, symbol);
        let sym = table.symbol(symbol);
        if groups.is_empty() || sym.offset >= limit || this_common != current_common {
            groups.push(Vec::new());
            limit = 0;
            current_common = this_common;
        }
        if let Some(group) = groups.last_mut() {
            group.push(symbol);
        }
        limit = limit.max(sym.offset + sym.size);
    }
    groups
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::loader::load_str;
    use crate::tools::testing::{scope_named, symbol_named};

    fn names(table: &SymbolTable, groups: Vec<Vec<SymbolId>>) -> Vec<Vec<&str>> {
        groups
            .into_iter()
            .map(|group| group.into_iter().map(|symbol| table.symbol_name(symbol)).collect())
            .collect()
    }

    #[test]
    fn test_overlapping_storage_is_grouped() {
        let table = load_str(
            "program main {
               integer :: a @ 0:4, b @ 4:4, c(2) @ 0:8, d @ 16:4, e @ 20:4
               equivalence (a, c)
               equivalence (b, c(2))
               equivalence (d, e)
             }",
        )
        .unwrap();
        let groups = get_storage_associations(&table, scope_named(&table, "main"));
        assert_eq!(names(&table, groups), vec![vec!["c", "a", "b"], vec!["d"], vec!["e"]]);
    }

    #[test]
    fn test_common_block_change_starts_a_group() {
        let table = load_str(
            "program main {
               integer :: x @ 0:4, y @ 0:4, z @ 4:4
               common /blk/ y, z
               equivalence (x, y)
               equivalence (z, y)
             }",
        )
        .unwrap();
        let groups = get_storage_associations(&table, scope_named(&table, "main"));
        assert_eq!(names(&table, groups), vec![vec!["x"], vec!["y"], vec!["z"]]);
        assert_eq!(table.symbol(symbol_named(&table, "z")).offset, 4);
    }

    #[test]
    fn test_no_equivalence() {
        let table = load_str("program main { integer :: a }").unwrap();
        assert!(get_storage_associations(&table, scope_named(&table, "main")).is_empty());
    }
}
