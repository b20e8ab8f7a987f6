//! Use, host and construct association, and PRIVATE accessibility

use crate::common::{MessageText, deref};
use crate::symbols::{Attrs, Details, EquivalenceSet, ScopeId, ScopeKind, SymbolId, SymbolTable};

use super::predicates::{
    find_common_block_containing, is_dummy, is_function_scope, is_intent_in, is_pointer, is_pure_procedure_scope,
};
use super::scopes::{
    does_scope_contain, find_module_containing, find_module_file_containing, get_program_unit_containing,
    get_program_unit_or_block_construct_containing, get_top_level_unit_containing,
};

/// Follow use, host and construct association to the entity a name denotes.
///
/// A construct association resolves through its selector only when the
/// selector is a whole variable and the association is not a SELECT RANK
/// case. With `stop_at_type_guard`, a SELECT TYPE guard is not resolved.
pub fn resolve_associations(table: &SymbolTable, symbol: SymbolId, stop_at_type_guard: bool) -> SymbolId {
    let ultimate = table.ultimate(symbol);
    if let Details::AssocEntity(details) = &table.symbol(ultimate).details
        && details.rank.is_none()
        && !(stop_at_type_guard && details.is_type_guard)
        && let Some(target) = details.selector.as_ref().and_then(|selector| selector.unwrap_whole_symbol())
    {
        return resolve_associations(table, target, stop_at_type_guard);
    }
    ultimate
}

/// Like [`resolve_associations`], but a selector that designates part of a
/// variable also resolves, to the variable's base symbol
pub fn get_association_root(table: &SymbolTable, symbol: SymbolId, stop_at_type_guard: bool) -> SymbolId {
    let resolved = resolve_associations(table, symbol, stop_at_type_guard);
    if let Details::AssocEntity(details) = &table.symbol(resolved).details
        && details.rank.is_none()
        && !(stop_at_type_guard && details.is_type_guard)
        && let Some(base) = details.selector.as_ref().and_then(|selector| selector.first_symbol())
    {
        return get_association_root(table, base, stop_at_type_guard);
    }
    resolved
}

/// Whether `symbol` is visible in `scope` by use association from a module
/// outside the program unit tree of `scope`
pub fn is_use_associated(table: &SymbolTable, symbol: SymbolId, scope: ScopeId) -> bool {
    let owner = table.ultimate_symbol(symbol).owner;
    if table.is_top_level(owner) || table.is_top_level(scope) {
        return false;
    }
    let unit = get_top_level_unit_containing(table, owner);
    table.scope(unit).kind == ScopeKind::Module
        && unit != get_top_level_unit_containing(table, scope)
}

fn follow_host_assoc(table: &SymbolTable, symbol: SymbolId) -> SymbolId {
    let mut current = symbol;
    while let Details::HostAssoc(details) = &table.symbol(current).details {
        current = details.symbol;
    }
    current
}

/// Whether `symbol` is declared in a host of `scope`
pub fn is_host_associated(table: &SymbolTable, symbol: SymbolId, scope: ScopeId) -> bool {
    let owner = table.symbol(follow_host_assoc(table, symbol)).owner;
    table.is_top_level(owner)
        || does_scope_contain(
            table,
            Some(get_program_unit_or_block_construct_containing(table, owner)),
            get_program_unit_or_block_construct_containing(table, scope),
        )
}

/// Whether `symbol` is declared in a host of the subprogram containing `scope`
pub fn is_host_associated_into_subprogram(table: &SymbolTable, symbol: SymbolId, scope: ScopeId) -> bool {
    let owner = table.symbol(follow_host_assoc(table, symbol)).owner;
    table.is_top_level(owner)
        || does_scope_contain(
            table,
            Some(get_program_unit_or_block_construct_containing(table, owner)),
            get_program_unit_containing(table, scope),
        )
}

/// The entity through which `object` is visible outside of `scope` (C1594):
/// an INTENT(IN) dummy, a pointer dummy of a pure function, an object of
/// another program unit, or the common block holding it
pub fn find_externally_visible_object(
    table: &SymbolTable,
    object: SymbolId,
    scope: ScopeId,
    is_pointer_definition: bool,
) -> Option<SymbolId> {
    let ultimate = get_association_root(table, object, false);
    let owner = table.symbol(ultimate).owner;
    if is_dummy(table, ultimate) {
        if is_intent_in(table, ultimate) {
            return Some(ultimate);
        }
        if !is_pointer_definition
            && is_pointer(table, ultimate)
            && is_pure_procedure_scope(table, owner)
            && is_function_scope(table, owner)
        {
            return Some(ultimate);
        }
    } else if table.scope(owner).is_derived_type() {
        return None;
    } else if get_program_unit_containing(table, owner) != get_program_unit_containing(table, scope) {
        return Some(object);
    } else if let Some(block) = find_common_block_containing(table, ultimate) {
        return Some(block);
    }
    None
}

/// The specific procedure of the same name when `symbol` is a generic,
/// otherwise `symbol` itself
pub fn bypass_generic(table: &SymbolTable, symbol: SymbolId) -> SymbolId {
    table
        .ultimate_symbol(symbol)
        .details
        .as_generic()
        .and_then(|generic| generic.specific)
        .unwrap_or(symbol)
}

/// The Cray pointer associated with a pointee
pub fn get_cray_pointer(table: &SymbolTable, pointee: SymbolId) -> SymbolId {
    let name = table.symbol(pointee).name;
    let owner = table.ultimate_symbol(pointee).owner;
    let found = table
        .scope(owner)
        .cray_pointers
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|&(_, pointer)| pointer);
    deref(found, "Cray pointer")
}

/// The EQUIVALENCE set an entity belongs to
pub fn find_equivalence_set(table: &SymbolTable, symbol: SymbolId) -> Option<&EquivalenceSet> {
    let ultimate = table.ultimate(symbol);
    table
        .scope(table.symbol(ultimate).owner)
        .equivalence_sets
        .iter()
        .find(|set| set.iter().any(|object| object.symbol == ultimate))
}

/// A PRIVATE entity is accessible only inside the module that declares it
pub fn is_accessible(table: &SymbolTable, symbol: SymbolId, scope: ScopeId) -> bool {
    let ultimate = table.ultimate_symbol(symbol);
    if !ultimate.has(Attrs::PRIVATE) {
        return true;
    }
    find_module_containing(table, ultimate.owner).is_none_or(|module| table.contains(module, scope))
}

/// Error for a reference from `scope` to an inaccessible PRIVATE name.
///
/// Nothing is reported inside a module file: named constants substituted
/// there may legitimately spell out private components.
pub fn check_accessible_symbol(table: &SymbolTable, scope: ScopeId, symbol: SymbolId) -> Option<MessageText> {
    if is_accessible(table, symbol, scope) || find_module_file_containing(table, scope).is_some() {
        return None;
    }
    let owner = table.ultimate_symbol(symbol).owner;
    let module = deref(find_module_containing(table, owner), "module containing a PRIVATE name");
    let module_name = deref(table.scope(module).symbol, "module symbol");
    Some(MessageText::error(format!(
        "PRIVATE name '{}' is accessible only within module '{}'",
        table.symbol_name(symbol),
        table.symbol_name(module_name)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Span;
    use crate::evaluate::{DataRef, DynamicType, Expr, TypeCategory};
    use crate::loader::load_str;
    use crate::symbols::{AssocEntityDetails, GenericDetails, GenericKind};
    use crate::tools::testing::{scope_named, symbol_named};

    const MODULES: &str = "
        module m {
          integer, private :: secret
          integer :: open
          subroutine inner() { integer :: local }
        }
        program main { use m }
        modfile module cache { integer :: copy }
    ";

    #[test]
    fn test_private_name_accessibility() {
        let table = load_str(MODULES).unwrap();
        let secret = symbol_named(&table, "secret");
        let inner = scope_named(&table, "inner");
        let main = scope_named(&table, "main");
        let cache = scope_named(&table, "cache");

        assert!(is_accessible(&table, secret, inner));
        assert!(!is_accessible(&table, secret, main));
        assert!(is_accessible(&table, symbol_named(&table, "open"), main));
        assert!(check_accessible_symbol(&table, inner, secret).is_none());
        assert!(check_accessible_symbol(&table, cache, secret).is_none());

        let message = check_accessible_symbol(&table, main, secret).unwrap();
        assert_eq!(message.text, "PRIVATE name 'secret' is accessible only within module 'm'");
    }

    #[test]
    fn test_use_and_host_association() {
        let table = load_str(MODULES).unwrap();
        let main = scope_named(&table, "main");
        let inner = scope_named(&table, "inner");
        let open = symbol_named(&table, "open");

        assert!(is_use_associated(&table, open, main));
        assert!(!is_use_associated(&table, open, inner));
        assert!(is_host_associated(&table, open, inner));
        assert!(is_host_associated_into_subprogram(&table, open, inner));
        assert!(!is_host_associated(&table, symbol_named(&table, "local"), inner));
    }

    #[test]
    fn test_intrinsic_module_entities_are_not_use_associated() {
        let table = load_str(
            "intrinsic module iso_c_binding { integer :: c_int }
             program main { use, intrinsic :: iso_c_binding }",
        )
        .unwrap();
        let main = scope_named(&table, "main");
        let c_int = symbol_named(&table, "c_int");
        assert_eq!(table.scope(table.symbol(c_int).owner).kind, ScopeKind::Module);
        assert!(!is_use_associated(&table, c_int, main));
    }

    #[test]
    fn test_construct_association_roots() {
        let mut table = load_str("program p { integer :: x(10); integer :: y }").unwrap();
        let program = scope_named(&table, "p");
        let x = symbol_named(&table, "x");
        let block = table.add_scope(program, ScopeKind::OtherConstruct, None);

        let whole = AssocEntityDetails {
            selector: Some(Expr::symbol(x)),
            ..AssocEntityDetails::default()
        };
        let a = table
            .add_symbol(block, "a", Attrs::empty(), Details::AssocEntity(whole), Span::default())
            .unwrap();
        let element = AssocEntityDetails {
            selector: Some(Expr::Designator(DataRef::ArrayElement {
                base: Box::new(DataRef::Symbol(x)),
                subscripts: vec![Expr::Constant(DynamicType::intrinsic(TypeCategory::Integer, 4))],
            })),
            ..AssocEntityDetails::default()
        };
        let e = table
            .add_symbol(block, "e", Attrs::empty(), Details::AssocEntity(element), Span::default())
            .unwrap();
        let guard = AssocEntityDetails {
            selector: Some(Expr::symbol(x)),
            is_type_guard: true,
            ..AssocEntityDetails::default()
        };
        let g = table
            .add_symbol(block, "g", Attrs::empty(), Details::AssocEntity(guard), Span::default())
            .unwrap();

        assert_eq!(resolve_associations(&table, a, false), x);
        assert_eq!(resolve_associations(&table, e, false), e);
        assert_eq!(get_association_root(&table, e, false), x);
        assert_eq!(resolve_associations(&table, g, false), x);
        assert_eq!(resolve_associations(&table, g, true), g);
    }

    #[test]
    fn test_externally_visible_objects() {
        let table = load_str(
            "module m {
               integer :: global
               pure function f(d, q) { integer, intent(in) :: d; integer, pointer :: q; integer :: f }
               subroutine s(w) { integer :: w; common /blk/ c; integer :: c }
             }",
        )
        .unwrap();
        let f = scope_named(&table, "f");
        let s = scope_named(&table, "s");
        let d = symbol_named(&table, "d");
        let q = symbol_named(&table, "q");

        assert_eq!(find_externally_visible_object(&table, d, f, false), Some(d));
        assert_eq!(find_externally_visible_object(&table, q, f, false), Some(q));
        assert_eq!(find_externally_visible_object(&table, q, f, true), None);
        let global = symbol_named(&table, "global");
        assert_eq!(find_externally_visible_object(&table, global, f, false), Some(global));
        let c = symbol_named(&table, "c");
        let block = find_common_block_containing(&table, c).unwrap();
        assert_eq!(find_externally_visible_object(&table, c, s, false), Some(block));
        assert_eq!(find_externally_visible_object(&table, symbol_named(&table, "w"), s, false), None);
    }

    #[test]
    fn test_cray_pointer_and_equivalence() {
        let table = load_str(
            "subroutine s() { integer :: ptr; real :: pointee; pointer (ptr, pointee)
                              real :: a; real :: b(4); real :: alone; equivalence (a, b(2)) }",
        )
        .unwrap();
        let ptr = symbol_named(&table, "ptr");
        assert_eq!(get_cray_pointer(&table, symbol_named(&table, "pointee")), ptr);
        let set = find_equivalence_set(&table, symbol_named(&table, "b")).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set[1].subscripts, vec![2]);
        assert!(find_equivalence_set(&table, symbol_named(&table, "alone")).is_none());
    }

    #[test]
    fn test_bypass_generic() {
        let mut table = load_str("module m { subroutine gen(x) { integer :: x } }").unwrap();
        let module = scope_named(&table, "m");
        let specific = symbol_named(&table, "gen");
        let mut details = GenericDetails::new(GenericKind::Name);
        details.specific = Some(specific);
        let generic = table
            .add_symbol(module, "g", Attrs::empty(), Details::Generic(details), Span::default())
            .unwrap();

        assert_eq!(bypass_generic(&table, generic), specific);
        assert_eq!(bypass_generic(&table, specific), specific);
    }
}
