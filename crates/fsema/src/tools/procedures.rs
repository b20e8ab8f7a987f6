//! Procedure classification and resolution through interfaces and bindings

use std::collections::HashSet;
use std::fmt;

use crate::symbols::{Attrs, Details, ScopeKind, SubprogramKind, SymbolId, SymbolTable};

use super::association::{get_association_root, is_accessible};
use super::derived::find_parent_type_spec_scope;
use super::predicates::{is_dummy, is_function_result, is_pointer, is_procedure, is_procedure_pointer};

/// How a procedure is defined (15.2.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcedureDefinitionClass {
    /// Not a procedure
    None,
    Intrinsic,
    External,
    Internal,
    Module,
    Dummy,
    Pointer,
    StatementFunction,
}

impl fmt::Display for ProcedureDefinitionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcedureDefinitionClass::None => "none",
            ProcedureDefinitionClass::Intrinsic => "intrinsic",
            ProcedureDefinitionClass::External => "external",
            ProcedureDefinitionClass::Internal => "internal",
            ProcedureDefinitionClass::Module => "module",
            ProcedureDefinitionClass::Dummy => "dummy",
            ProcedureDefinitionClass::Pointer => "pointer",
            ProcedureDefinitionClass::StatementFunction => "statement function",
        };
        f.write_str(s)
    }
}

/// Classify a procedure. The checks apply in a fixed order: the first
/// that matches decides.
pub fn classify_procedure(table: &SymbolTable, symbol: SymbolId) -> ProcedureDefinitionClass {
    let ultimate = table.ultimate(symbol);
    let ultimate_symbol = table.symbol(ultimate);
    if !is_procedure(table, ultimate) {
        return ProcedureDefinitionClass::None;
    }
    if ultimate_symbol.has(Attrs::INTRINSIC) {
        return ProcedureDefinitionClass::Intrinsic;
    }
    if is_dummy(table, ultimate) {
        return ProcedureDefinitionClass::Dummy;
    }
    if is_procedure_pointer(table, symbol) {
        return ProcedureDefinitionClass::Pointer;
    }
    if ultimate_symbol.has(Attrs::EXTERNAL) {
        return ProcedureDefinitionClass::External;
    }
    if let Details::SubprogramName(details) = &ultimate_symbol.details {
        return match details.kind {
            SubprogramKind::Module => ProcedureDefinitionClass::Module,
            SubprogramKind::Internal => ProcedureDefinitionClass::Internal,
        };
    }
    if let Some(subprogram) = find_subprogram(table, symbol) {
        if table
            .symbol(subprogram)
            .details
            .as_subprogram()
            .is_some_and(|details| details.stmt_function)
        {
            return ProcedureDefinitionClass::StatementFunction;
        }
        match table.scope(ultimate_symbol.owner).kind {
            ScopeKind::Global | ScopeKind::IntrinsicModules => return ProcedureDefinitionClass::External,
            ScopeKind::Module => return ProcedureDefinitionClass::Module,
            ScopeKind::MainProgram | ScopeKind::Subprogram => return ProcedureDefinitionClass::Internal,
            _ => {}
        }
    }
    ProcedureDefinitionClass::None
}

pub fn is_external(table: &SymbolTable, symbol: SymbolId) -> bool {
    classify_procedure(table, symbol) == ProcedureDefinitionClass::External
}

pub fn is_module_procedure(table: &SymbolTable, symbol: SymbolId) -> bool {
    classify_procedure(table, symbol) == ProcedureDefinitionClass::Module
}

/// The subprogram that provides the explicit interface of `symbol`, if any
pub fn find_interface(table: &SymbolTable, symbol: SymbolId) -> Option<SymbolId> {
    match &table.symbol(symbol).details {
        Details::ProcEntity(details) => details.interface.and_then(|interface| find_interface(table, interface)),
        Details::ProcBinding(details) => find_interface(table, details.symbol),
        Details::Subprogram(_) => Some(symbol),
        Details::Use(details) => find_interface(table, details.symbol),
        Details::HostAssoc(details) => find_interface(table, details.symbol),
        Details::Generic(details) => details.specific.and_then(|specific| find_interface(table, specific)),
        _ => None,
    }
}

/// The subprogram `symbol` denotes. A procedure entity without an
/// interface denotes itself.
pub fn find_subprogram(table: &SymbolTable, symbol: SymbolId) -> Option<SymbolId> {
    match &table.symbol(symbol).details {
        Details::ProcEntity(details) => match details.interface {
            Some(interface) => find_subprogram(table, interface),
            None => Some(symbol),
        },
        Details::ProcBinding(details) => find_subprogram(table, details.symbol),
        Details::Subprogram(_) => Some(symbol),
        Details::Use(details) => find_subprogram(table, details.symbol),
        Details::HostAssoc(details) => find_subprogram(table, details.symbol),
        Details::Generic(details) => details.specific.and_then(|specific| find_subprogram(table, specific)),
        _ => None,
    }
}

/// The global-scope definition of an external procedure or interface.
///
/// A local declaration links to the global entity of the same name only
/// when neither side has a binding label that differs from that name.
pub fn find_global(table: &SymbolTable, original: SymbolId) -> Option<SymbolId> {
    let ultimate = table.ultimate(original);
    let symbol = table.symbol(ultimate);
    if table.scope(symbol.owner).is_global() {
        return Some(ultimate);
    }
    let is_local = if is_dummy(table, ultimate) || is_pointer(table, ultimate) {
        false
    } else {
        match &symbol.details {
            Details::ProcEntity(_) => is_external(table, ultimate),
            Details::Subprogram(details) => details.is_interface,
            _ => false,
        }
    };
    if !is_local {
        return None;
    }
    let name = table.symbol_name(ultimate);
    if symbol.bind_name.as_deref().is_some_and(|bind| bind != name) {
        return None;
    }
    let global = table.scope(table.global()).find(symbol.name)?;
    let global_bind = table.symbol(global).bind_name.as_deref();
    global_bind.is_none_or(|bind| bind == table.symbol_name(global)).then_some(global)
}

/// A binding of the parent type overridden by a type-bound procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverriddenBinding {
    pub binding: SymbolId,
    /// The overridden binding is DEFERRED but not accessible, so it cannot
    /// actually be overridden
    pub is_inaccessible_deferred: bool,
}

/// The binding in the parent type that `symbol` overrides (7.5.7.3).
/// Only accessible bindings are overridden.
pub fn find_overridden_binding(table: &SymbolTable, symbol: SymbolId) -> Option<OverriddenBinding> {
    let binding = table.symbol(symbol);
    if !matches!(binding.details, Details::ProcBinding(_)) {
        return None;
    }
    let parent = find_parent_type_spec_scope(table, binding.owner)?.as_derived()?;
    let parent_type = table.derived(parent).type_symbol;
    let parent_scope = table.symbol(parent_type).scope?;
    let overridden = table.find_component(parent_scope, binding.name)?;
    if is_accessible(table, overridden, binding.owner) {
        Some(OverriddenBinding { binding: overridden, is_inaccessible_deferred: false })
    } else if table.symbol(overridden).has(Attrs::DEFERRED) {
        Some(OverriddenBinding { binding: overridden, is_inaccessible_deferred: true })
    } else {
        None
    }
}

/// The interface body of a separate module procedure
pub fn find_separate_module_subprogram_interface(table: &SymbolTable, procedure: Option<SymbolId>) -> Option<SymbolId> {
    table.symbol(procedure?).details.as_subprogram()?.module_interface
}

/// The result variable of a function, through procedure entities and
/// bindings
pub fn find_function_result(table: &SymbolTable, symbol: SymbolId) -> Option<SymbolId> {
    function_result(table, symbol, &mut HashSet::new())
}

fn function_result(table: &SymbolTable, symbol: SymbolId, seen: &mut HashSet<SymbolId>) -> Option<SymbolId> {
    let root = get_association_root(table, symbol, false);
    if !seen.insert(root) {
        return None;
    }
    match &table.symbol(root).details {
        Details::Subprogram(details) => details.result,
        Details::ProcEntity(details) => details.interface.and_then(|interface| function_result(table, interface, seen)),
        Details::ProcBinding(details) => function_result(table, details.symbol, seen),
        _ => None,
    }
}

/// The function (or ENTRY) whose name a function result shares
pub fn is_function_result_with_same_name_as_function(table: &SymbolTable, symbol: SymbolId) -> Option<SymbolId> {
    if !is_function_result(table, symbol) {
        return None;
    }
    let result = table.symbol(symbol);
    if let Some(function) = table.scope(result.owner).symbol
        && table.symbol(function).name == result.name
    {
        return Some(function);
    }
    let outer = table.try_parent(result.owner)?;
    let outer_symbol = table.scope(outer).find(result.name)?;
    table
        .symbol(outer_symbol)
        .details
        .as_subprogram()
        .is_some_and(|details| details.entry_scope == Some(result.owner))
        .then_some(outer_symbol)
}

/// Whether a reference to `symbol` could be a function returning a data
/// pointer
pub fn could_be_data_pointer_valued_function(table: &SymbolTable, symbol: Option<SymbolId>) -> bool {
    let Some(symbol) = symbol else {
        return false;
    };
    let ultimate = table.ultimate(symbol);
    if let Some(result) = find_function_result(table, ultimate) {
        return is_pointer(table, result) && !is_procedure(table, result);
    }
    table.symbol(ultimate).details.as_generic().is_some_and(|generic| {
        generic
            .specific_procs
            .iter()
            .any(|&specific| could_be_data_pointer_valued_function(table, Some(specific)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_str;
    use crate::tools::testing::{scope_named, symbol_named};

    #[test]
    fn test_classification_precedence() {
        let table = load_str(
            "module m {
               subroutine modproc() { }
               subroutine host(dummy) {
                 procedure(modproc) :: dummy
                 procedure(modproc), pointer :: ptr
                 external :: ext
                 intrinsic :: sin
                 stmtfunc sf(x)
                 subroutine internal() { }
               }
             }
             subroutine global_sub() { }",
        )
        .unwrap();
        let class = |name| classify_procedure(&table, symbol_named(&table, name));

        assert_eq!(class("modproc"), ProcedureDefinitionClass::Module);
        assert_eq!(class("dummy"), ProcedureDefinitionClass::Dummy);
        assert_eq!(class("ptr"), ProcedureDefinitionClass::Pointer);
        assert_eq!(class("ext"), ProcedureDefinitionClass::External);
        assert_eq!(class("sin"), ProcedureDefinitionClass::Intrinsic);
        assert_eq!(class("sf"), ProcedureDefinitionClass::StatementFunction);
        assert_eq!(class("internal"), ProcedureDefinitionClass::Internal);
        assert_eq!(class("global_sub"), ProcedureDefinitionClass::External);
        assert_eq!(class("m"), ProcedureDefinitionClass::None);
        assert!(is_module_procedure(&table, symbol_named(&table, "modproc")));
        assert!(is_external(&table, symbol_named(&table, "ext")));
    }

    #[test]
    fn test_interface_and_subprogram_lookup() {
        let table = load_str(
            "module m {
               subroutine target(x) { integer :: x }
               procedure(target), pointer :: p
               procedure, pointer :: bare
             }",
        )
        .unwrap();
        let target = symbol_named(&table, "target");
        let p = symbol_named(&table, "p");
        let bare = symbol_named(&table, "bare");

        assert_eq!(find_interface(&table, p), Some(target));
        assert_eq!(find_subprogram(&table, p), Some(target));
        assert_eq!(find_interface(&table, bare), None);
        assert_eq!(find_subprogram(&table, bare), Some(bare));
        assert_eq!(find_interface(&table, symbol_named(&table, "x")), None);
    }

    #[test]
    fn test_global_linkage() {
        let table = load_str(
            "subroutine ext() { }
             bind(c, name=\"other\") subroutine renamed() { }
             program main {
               external :: ext
               external :: renamed
             }",
        )
        .unwrap();
        let main = scope_named(&table, "main");
        let global_ext = symbol_named(&table, "ext");
        let ext_name = table.lookup_name("ext").unwrap();
        let local_ext = table.scope(main).find(ext_name).unwrap();
        assert_eq!(find_global(&table, local_ext), Some(global_ext));
        assert_eq!(find_global(&table, global_ext), Some(global_ext));

        let renamed = table.lookup_name("renamed").unwrap();
        let local_renamed = table.scope(main).find(renamed).unwrap();
        assert_eq!(find_global(&table, local_renamed), None);
    }

    #[test]
    fn test_overridden_bindings() {
        let table = load_str(
            "module m {
               type, abstract :: base {
                 procedure(iface), deferred :: run
                 procedure, private :: hidden => impl
                 procedure :: shown => impl
               }
               type, extends(base) :: child {
                 procedure :: run => impl
                 procedure :: shown => impl
               }
               abstract interface { subroutine iface(this) { class(base) :: this } }
               subroutine impl(this) { class(base) :: this }
             }",
        )
        .unwrap();
        let child = scope_named(&table, "child");
        let run_name = table.lookup_name("run").unwrap();
        let shown_name = table.lookup_name("shown").unwrap();
        let child_run = table.scope(child).find(run_name).unwrap();
        let child_shown = table.scope(child).find(shown_name).unwrap();

        let overridden = find_overridden_binding(&table, child_run).unwrap();
        assert!(!overridden.is_inaccessible_deferred);
        assert_eq!(table.symbol_name(overridden.binding), "run");
        assert!(find_overridden_binding(&table, child_shown).is_some());
        assert!(find_overridden_binding(&table, symbol_named(&table, "impl")).is_none());
    }

    #[test]
    fn test_function_results() {
        let table = load_str(
            "module m {
               function f(x) { integer :: x; integer, pointer :: f }
               function g(x) result(r) { integer :: x; integer :: r }
               procedure(f), pointer :: fp
             }",
        )
        .unwrap();
        let f = symbol_named(&table, "f");
        let fp = symbol_named(&table, "fp");
        let f_scope = scope_named(&table, "f");
        let f_name = table.symbol(f).name;
        let f_result = table.scope(f_scope).find(f_name).unwrap();
        let r = symbol_named(&table, "r");

        assert_eq!(find_function_result(&table, f), Some(f_result));
        assert_eq!(find_function_result(&table, fp), Some(f_result));
        assert_eq!(is_function_result_with_same_name_as_function(&table, f_result), Some(f));
        assert_eq!(is_function_result_with_same_name_as_function(&table, r), None);
        assert!(could_be_data_pointer_valued_function(&table, Some(f)));
        assert!(!could_be_data_pointer_valued_function(&table, Some(symbol_named(&table, "g"))));
        assert!(!could_be_data_pointer_valued_function(&table, None));
    }

    #[test]
    fn test_entry_result_shares_name() {
        let table = load_str("module m { function f(x) { integer :: x; real :: f; entry e(y) } }").unwrap();
        let entry = symbol_named(&table, "e");
        let entry_scope = table.symbol(entry).details.as_subprogram().unwrap().entry_scope.unwrap();
        let entry_result = table.symbol(entry).details.as_subprogram().unwrap().result.unwrap();
        assert_eq!(table.symbol(entry_result).owner, entry_scope);
        assert_eq!(is_function_result_with_same_name_as_function(&table, entry_result), Some(entry));
    }
}
