//! Upward searches through the scope tree

use crate::common::{deref, die};
use crate::symbols::{Details, ScopeId, ScopeKind, SymbolId, SymbolTable};

use super::predicates::is_pure_procedure_scope;

/// Closest scope, starting with `start` itself, that satisfies `predicate`
pub fn find_scope_containing(
    table: &SymbolTable,
    start: ScopeId,
    mut predicate: impl FnMut(ScopeId) -> bool,
) -> Option<ScopeId> {
    let mut scope = start;
    loop {
        if predicate(scope) {
            return Some(scope);
        }
        if table.is_top_level(scope) {
            return None;
        }
        scope = table.parent(scope);
    }
}

/// Unit directly nested in the global scope that contains `start`
pub fn get_top_level_unit_containing(table: &SymbolTable, start: ScopeId) -> ScopeId {
    if table.is_top_level(start) {
        die("top-level unit requested for the global scope");
    }
    deref(
        find_scope_containing(table, start, |scope| table.is_top_level(table.parent(scope))),
        "top-level unit",
    )
}

pub fn get_top_level_unit_containing_symbol(table: &SymbolTable, symbol: SymbolId) -> ScopeId {
    get_top_level_unit_containing(table, table.symbol(symbol).owner)
}

/// A module scope that is not a submodule
pub fn is_module(table: &SymbolTable, scope: ScopeId) -> bool {
    module_kind(table, scope) == Some(false)
}

pub fn is_submodule(table: &SymbolTable, scope: ScopeId) -> bool {
    module_kind(table, scope) == Some(true)
}

/// `Some(is_submodule)` for module scopes
fn module_kind(table: &SymbolTable, scope: ScopeId) -> Option<bool> {
    let scope = table.scope(scope);
    if scope.kind != ScopeKind::Module {
        return None;
    }
    match scope.symbol.map(|symbol| &table.symbol(symbol).details) {
        Some(Details::Module(details)) => Some(details.is_submodule),
        _ => Some(false),
    }
}

pub fn find_module_containing(table: &SymbolTable, start: ScopeId) -> Option<ScopeId> {
    find_scope_containing(table, start, |scope| is_module(table, scope))
}

pub fn find_module_or_submodule_containing(table: &SymbolTable, start: ScopeId) -> Option<ScopeId> {
    find_scope_containing(table, start, |scope| table.scope(scope).kind == ScopeKind::Module)
}

pub fn find_module_file_containing(table: &SymbolTable, start: ScopeId) -> Option<ScopeId> {
    find_scope_containing(table, start, |scope| table.scope(scope).is_module_file)
}

/// Innermost module, main program, subprogram or BLOCK DATA containing `start`
pub fn get_program_unit_containing(table: &SymbolTable, start: ScopeId) -> ScopeId {
    if table.is_top_level(start) {
        die("program unit requested for the global scope");
    }
    deref(
        find_scope_containing(table, start, |scope| table.scope(scope).kind.is_program_unit()),
        "program unit",
    )
}

pub fn get_program_unit_containing_symbol(table: &SymbolTable, symbol: SymbolId) -> ScopeId {
    get_program_unit_containing(table, table.symbol(symbol).owner)
}

/// Like [`get_program_unit_containing`], but a BLOCK construct also counts
pub fn get_program_unit_or_block_construct_containing(table: &SymbolTable, start: ScopeId) -> ScopeId {
    if table.is_top_level(start) {
        die("program unit requested for the global scope");
    }
    deref(
        find_scope_containing(table, start, |scope| {
            let kind = table.scope(scope).kind;
            kind.is_program_unit() || kind == ScopeKind::BlockConstruct
        }),
        "program unit or BLOCK construct",
    )
}

pub fn get_program_unit_or_block_construct_containing_symbol(table: &SymbolTable, symbol: SymbolId) -> ScopeId {
    get_program_unit_or_block_construct_containing(table, table.symbol(symbol).owner)
}

/// The innermost program unit, when it is a pure procedure.
///
/// Internal subprograms of a pure subprogram are pure themselves, so only
/// the innermost unit needs to be examined.
pub fn find_pure_procedure_containing(table: &SymbolTable, start: ScopeId) -> Option<ScopeId> {
    if table.is_top_level(start) {
        return None;
    }
    let scope = get_program_unit_containing(table, start);
    is_pure_procedure_scope(table, scope).then_some(scope)
}

pub fn find_openacc_construct_containing(table: &SymbolTable, start: Option<ScopeId>) -> Option<ScopeId> {
    find_scope_containing(table, start?, |scope| table.scope(scope).kind == ScopeKind::OpenAccConstruct)
}

/// Whether `ancestor` strictly contains `descendant`
pub fn does_scope_contain(table: &SymbolTable, ancestor: Option<ScopeId>, descendant: ScopeId) -> bool {
    let Some(ancestor) = ancestor else {
        return false;
    };
    !table.is_top_level(descendant)
        && find_scope_containing(table, table.parent(descendant), |scope| scope == ancestor).is_some()
}

pub fn does_scope_contain_symbol(table: &SymbolTable, ancestor: Option<ScopeId>, symbol: SymbolId) -> bool {
    does_scope_contain(table, ancestor, table.symbol(symbol).owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_str;
    use crate::tools::testing::{scope_named, symbol_named};

    const SOURCE: &str = "
        module m {
          integer :: x
          pure subroutine p(a) {
            integer, intent(in) :: a
            block { integer :: y }
          }
        }
        submodule(m) s { real :: z }
        program main { acc { integer :: i } }
        modfile module mf { integer :: w }
    ";

    #[test]
    fn test_top_level_units_are_children_of_global() {
        let table = load_str(SOURCE).unwrap();
        for scope in table.scope_ids().filter(|&scope| !table.is_top_level(scope)) {
            let unit = get_top_level_unit_containing(&table, scope);
            assert_eq!(table.parent(unit), table.global());
        }
    }

    #[test]
    fn test_enclosing_unit_queries() {
        let table = load_str(SOURCE).unwrap();
        let m = scope_named(&table, "m");
        let p = scope_named(&table, "p");
        let block = table.scope(p).children()[0];
        let s = scope_named(&table, "s");

        assert_eq!(find_module_containing(&table, block), Some(m));
        assert_eq!(get_program_unit_containing(&table, block), p);
        assert_eq!(get_program_unit_or_block_construct_containing(&table, block), block);
        assert_eq!(find_pure_procedure_containing(&table, block), Some(p));
        assert_eq!(find_pure_procedure_containing(&table, m), None);
        assert!(is_submodule(&table, s));
        assert!(!is_module(&table, s));
        assert_eq!(find_module_or_submodule_containing(&table, s), Some(s));
        assert_eq!(find_module_containing(&table, s), Some(m));
    }

    #[test]
    fn test_construct_and_module_file_queries() {
        let table = load_str(SOURCE).unwrap();
        let main = scope_named(&table, "main");
        let acc = table.scope(main).children()[0];
        let i = symbol_named(&table, "i");
        assert_eq!(find_openacc_construct_containing(&table, Some(table.symbol(i).owner)), Some(acc));
        assert_eq!(find_openacc_construct_containing(&table, Some(main)), None);
        assert_eq!(find_openacc_construct_containing(&table, None), None);

        let w = symbol_named(&table, "w");
        assert!(find_module_file_containing(&table, table.symbol(w).owner).is_some());
        assert!(find_module_file_containing(&table, main).is_none());
    }

    #[test]
    fn test_strict_containment() {
        let table = load_str(SOURCE).unwrap();
        let m = scope_named(&table, "m");
        let p = scope_named(&table, "p");
        assert!(does_scope_contain(&table, Some(m), p));
        assert!(!does_scope_contain(&table, Some(p), p));
        assert!(!does_scope_contain(&table, None, p));
        assert!(does_scope_contain_symbol(&table, Some(table.global()), symbol_named(&table, "x")));
    }
}
