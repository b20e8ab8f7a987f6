//! Derived-type property queries
//!
//! Finalization, defined assignment and defined input/output, parent types,
//! type parameter ordering and the instantiation cache.

use std::collections::HashSet;

use crate::evaluate::{DynamicType, are_same_derived_type};
use crate::symbols::{
    DeclTypeSpec, DefinedIo, DerivedCategory, DerivedTypeId, DerivedTypeSpec, Details, ScopeId, ScopeKind,
    SymbolFlags, SymbolId, SymbolTable,
};

use super::association::resolve_associations;
use super::components::{
    DirectComponentIterator, PotentialComponentIterator, find_event_or_lock_potential_component,
    find_polymorphic_allocatable_potential_component,
};
use super::predicates::{
    is_allocatable, is_assumed_rank, is_destructible, is_elemental_procedure, is_initialized, is_intent_out,
    is_pointer, is_pure_procedure, is_variable,
};

/// FINAL subroutines of the type whose single dummy argument has exactly
/// the type `spec`, ordered by name
pub fn finals_for_derived_type_instantiation(table: &SymbolTable, spec: DerivedTypeId) -> Vec<SymbolId> {
    let type_symbol = table.derived(spec).type_symbol;
    let Some(details) = table.symbol(type_symbol).details.as_derived_type() else {
        return Vec::new();
    };
    let mut finals: Vec<SymbolId> = details
        .finals
        .iter()
        .copied()
        .filter(|&subroutine| {
            let Some(subprogram) = table.symbol(subroutine).details.as_subprogram() else {
                return false;
            };
            let [Some(arg)] = subprogram.dummy_args.as_slice() else {
                return false;
            };
            matches!(
                table.symbol_type(*arg),
                Some(DeclTypeSpec::TypeDerived(arg_spec)) if are_same_derived_type(table, spec, *arg_spec)
            )
        })
        .collect();
    finals.sort_by(|&a, &b| table.symbol_name(a).cmp(table.symbol_name(b)));
    finals
}

/// The finalizer that would be invoked for an object of type `derived` and
/// the given rank, looking into potential components when the type itself
/// has none
pub fn is_finalizable(table: &SymbolTable, derived: DerivedTypeId, rank: Option<usize>) -> Option<SymbolId> {
    finalizable(table, derived, &mut HashSet::new(), false, rank)
}

/// The finalizer that would be invoked for `symbol`; pointers, assumed-rank
/// entities and dummies other than INTENT(OUT) are never finalized
pub fn is_finalizable_symbol(table: &SymbolTable, symbol: SymbolId) -> Option<SymbolId> {
    finalizable_symbol(table, symbol, &mut HashSet::new(), false)
}

fn finalizable_symbol(
    table: &SymbolTable,
    symbol: SymbolId,
    in_progress: &mut HashSet<DerivedTypeId>,
    with_impure: bool,
) -> Option<SymbolId> {
    if is_pointer(table, symbol) || is_assumed_rank(table, symbol) {
        return None;
    }
    let object = table.symbol(symbol).details.as_object()?;
    if object.is_dummy && !is_intent_out(table, symbol) {
        return None;
    }
    let derived = object.ty.as_ref()?.as_derived()?;
    finalizable(table, derived, in_progress, with_impure, Some(table.rank(symbol)))
}

fn finalizable(
    table: &SymbolTable,
    derived: DerivedTypeId,
    in_progress: &mut HashSet<DerivedTypeId>,
    with_impure: bool,
    rank: Option<usize>,
) -> Option<SymbolId> {
    let mut elemental = None;
    for final_ref in finals_for_derived_type_instantiation(table, derived) {
        let mut candidate = Some(table.ultimate(final_ref));
        if let Some(binding) = candidate.and_then(|symbol| table.symbol(symbol).details.as_proc_binding()) {
            candidate = Some(binding.symbol);
        }
        if let Some(symbol) = candidate
            && let Some(proc) = table.symbol(symbol).details.as_proc_entity()
        {
            candidate = proc.interface;
        }
        let Some(symbol) = candidate else {
            continue;
        };
        if is_elemental_procedure(table, symbol) {
            elemental = Some(symbol);
            continue;
        }
        if let Some(rank) = rank
            && let Some(subprogram) = table.symbol(symbol).details.as_subprogram()
            && let Some(Some(arg)) = subprogram.dummy_args.first()
            && !is_assumed_rank(table, *arg)
            && table.rank(*arg) != rank
        {
            continue;
        }
        if !with_impure || !is_pure_procedure(table, symbol) {
            return Some(symbol);
        }
        // A pure finalizer of matching rank rules out the elemental one, but
        // components may still have an impure finalizer
        elemental = None;
        break;
    }
    if let Some(elemental) = elemental
        && (!with_impure || !is_pure_procedure(table, elemental))
    {
        return Some(elemental);
    }
    if !in_progress.insert(derived) {
        return None;
    }
    let mut result = None;
    for component in PotentialComponentIterator::new(table, derived) {
        result = finalizable_symbol(table, component, in_progress, with_impure);
        if result.is_some() {
            break;
        }
    }
    in_progress.remove(&derived);
    if let Some(finalizer) = result {
        tracing::trace!(
            ty = table.symbol_name(table.derived(derived).type_symbol),
            finalizer = table.symbol_name(finalizer),
            "finalizer found in a component"
        );
    }
    result
}

/// An impure finalizer that would be invoked for `symbol`; `rank`
/// overrides the rank of the symbol
pub fn has_impure_final(table: &SymbolTable, original: SymbolId, rank: Option<usize>) -> Option<SymbolId> {
    let symbol = resolve_associations(table, original, true);
    let object = table.symbol(symbol).details.as_object()?;
    let derived = object.ty.as_ref()?.as_derived()?;
    if is_assumed_rank(table, symbol) {
        // assumed-rank entities are never finalizable (C839)
        return None;
    }
    let rank = rank.unwrap_or_else(|| table.rank(symbol));
    finalizable(table, derived, &mut HashSet::new(), true, Some(rank))
}

pub fn may_require_finalization(table: &SymbolTable, derived: DerivedTypeId) -> bool {
    is_finalizable(table, derived, None).is_some()
        || find_polymorphic_allocatable_potential_component(table, derived).is_some()
}

/// Whether assignment to an object of type `derived` might invoke a
/// defined assignment, directly or for one of its components
pub fn may_have_defined_assignment(table: &SymbolTable, derived: DerivedTypeId) -> bool {
    let mut checked = HashSet::new();
    defined_assignment_in(table, derived, &mut checked)
}

fn defined_assignment_in(table: &SymbolTable, derived: DerivedTypeId, checked: &mut HashSet<ScopeId>) -> bool {
    let Some(scope) = table.derived_scope(derived) else {
        return false;
    };
    if !checked.insert(scope) {
        return false;
    }
    for &symbol in table.scope(scope).symbols() {
        match &table.symbol(symbol).details {
            Details::Generic(generic) => {
                if generic.kind.is_assignment() {
                    return true;
                }
            }
            Details::Object(object) if !is_pointer(table, symbol) => match &object.ty {
                Some(ty) if ty.is_polymorphic() => return true,
                Some(ty) => {
                    if let Some(component_type) = ty.as_derived()
                        && defined_assignment_in(table, component_type, checked)
                    {
                        return true;
                    }
                }
                None => {}
            },
            _ => {}
        }
    }
    false
}

/// Whether defined input/output of kind `which` exists for `derived`:
/// a type-bound generic, then a generic interface visible from `scope`
/// whose specific takes this type, then the same for the parent type
pub fn has_defined_io(table: &SymbolTable, which: DefinedIo, derived: DerivedTypeId, scope: Option<ScopeId>) -> bool {
    if let Some(type_scope) = table.derived_scope(derived) {
        let type_bound = table.scope(type_scope).symbols().iter().any(|&symbol| {
            table
                .symbol(symbol)
                .details
                .as_generic()
                .is_some_and(|generic| generic.kind.as_defined_io() == Some(which))
        });
        if type_bound {
            return true;
        }
    }
    if let Some(start) = scope
        && let Some(name) = table.lookup_name(which.as_source())
    {
        let wanted = DynamicType::derived(derived, false);
        let mut current = start;
        while !table.scope(current).is_global() {
            let generic = table
                .scope(current)
                .find(name)
                .and_then(|symbol| table.ultimate_symbol(symbol).details.as_generic());
            if let Some(generic) = generic {
                let found = generic.specific_procs.iter().any(|&specific| {
                    get_dtv_arg_type_spec(table, table.ultimate(specific))
                        .is_some_and(|dummy| DynamicType::from_decl(dummy).is_tk_compatible_with(&wanted, table))
                });
                if found {
                    return true;
                }
            }
            current = table.parent(current);
        }
    }
    find_parent_type_spec(table, derived)
        .and_then(DeclTypeSpec::as_derived)
        .is_some_and(|parent| has_defined_io(table, which, parent, scope))
}

fn get_dtv_arg_type_spec(table: &SymbolTable, procedure: SymbolId) -> Option<&DeclTypeSpec> {
    let subprogram = table.symbol(procedure).details.as_subprogram()?;
    let arg = (*subprogram.dummy_args.first()?)?;
    table.symbol_type(arg)
}

/// Derived type of the first dummy argument of a defined input/output
/// procedure
pub fn get_dtv_arg_derived_type(table: &SymbolTable, procedure: SymbolId) -> Option<DerivedTypeId> {
    get_dtv_arg_type_spec(table, procedure)?.as_derived()
}

// Parent types

pub fn find_parent_type_spec(table: &SymbolTable, derived: DerivedTypeId) -> Option<&DeclTypeSpec> {
    find_parent_type_spec_symbol(table, table.derived(derived).type_symbol)
}

pub fn find_parent_type_spec_decl<'t>(table: &'t SymbolTable, decl: &DeclTypeSpec) -> Option<&'t DeclTypeSpec> {
    find_parent_type_spec(table, decl.as_derived()?)
}

/// Parent type of the derived type that defines `scope`
pub fn find_parent_type_spec_scope(table: &SymbolTable, scope: ScopeId) -> Option<&DeclTypeSpec> {
    let scope = table.scope(scope);
    if scope.kind != ScopeKind::DerivedType {
        return None;
    }
    find_parent_type_spec_symbol(table, scope.symbol?)
}

/// Type of the parent component of the derived type `type_symbol`
pub fn find_parent_type_spec_symbol(table: &SymbolTable, type_symbol: SymbolId) -> Option<&DeclTypeSpec> {
    let symbol = table.symbol(type_symbol);
    let scope = symbol.scope?;
    let &first = symbol.details.as_derived_type()?.component_names.first()?;
    let parent = table.scope(scope).find(first)?;
    if !table.symbol(parent).test(SymbolFlags::PARENT_COMP) {
        return None;
    }
    table.symbol_type(parent)
}

fn parent_type_symbol(table: &SymbolTable, type_symbol: SymbolId) -> Option<SymbolId> {
    let parent = find_parent_type_spec_symbol(table, type_symbol)?.as_derived()?;
    Some(table.derived(parent).type_symbol)
}

/// Type parameters in the order they appear in type-parameter lists of
/// structure constructors: inherited ones first
pub fn order_parameter_names(table: &SymbolTable, type_symbol: SymbolId) -> Vec<SymbolId> {
    let mut result = parent_type_symbol(table, type_symbol)
        .map(|parent| order_parameter_names(table, parent))
        .unwrap_or_default();
    if let Some(details) = table.symbol(type_symbol).details.as_derived_type() {
        result.extend_from_slice(&details.param_name_order);
    }
    result
}

/// Type parameter declarations in order, inherited ones first
pub fn order_parameter_declarations(table: &SymbolTable, type_symbol: SymbolId) -> Vec<SymbolId> {
    let mut result = parent_type_symbol(table, type_symbol)
        .map(|parent| order_parameter_declarations(table, parent))
        .unwrap_or_default();
    if let Some(details) = table.symbol(type_symbol).details.as_derived_type() {
        result.extend_from_slice(&details.param_decl_order);
    }
    result
}

/// The instantiation of `spec` cached in `scope`, creating it on first
/// request; instantiations with the same type and parameter values share
/// an id
pub fn find_or_instantiate_derived_type(
    table: &mut SymbolTable,
    scope: ScopeId,
    spec: DerivedTypeSpec,
    category: DerivedCategory,
) -> DeclTypeSpec {
    let type_symbol = table.ultimate(spec.type_symbol);
    let cached = table.scope(scope).instantiations().iter().copied().find(|&id| {
        let existing = table.derived(id);
        table.ultimate(existing.type_symbol) == type_symbol && existing.has_same_parameters(&spec)
    });
    if let Some(id) = cached {
        return DeclTypeSpec::derived(category, id);
    }
    let id = table.new_derived_type_spec(spec);
    table.add_instantiation(scope, id);
    tracing::debug!(
        ty = table.symbol_name(type_symbol),
        instantiation = id.index(),
        "new derived type instantiation"
    );
    DeclTypeSpec::derived(category, id)
}

/// Whether some direct component of `derived` is initialized by default
pub fn has_default_initialization(
    table: &SymbolTable,
    derived: DerivedTypeId,
    ignore_allocatable: bool,
    ignore_pointer: bool,
) -> bool {
    DirectComponentIterator::new(table, derived).into_iter().any(|component| {
        // an unallocated component has no subobjects to initialize
        !(ignore_allocatable && is_allocatable(table, component))
            && is_initialized(table, component, true, ignore_allocatable, ignore_pointer)
    })
}

/// Whether an object of type `derived` needs finalization or deallocation
/// when it goes away
pub fn has_destruction(table: &SymbolTable, derived: DerivedTypeId) -> bool {
    if !finals_for_derived_type_instantiation(table, derived).is_empty() {
        return true;
    }
    let type_symbol = table.derived(derived).type_symbol;
    DirectComponentIterator::new(table, derived)
        .into_iter()
        .any(|component| is_destructible(table, component, Some(type_symbol)))
}

/// EVENT_TYPE or LOCK_TYPE from an intrinsic module
pub fn is_event_type_or_lock_type(table: &SymbolTable, derived: Option<DerivedTypeId>) -> bool {
    let Some(derived) = derived else {
        return false;
    };
    let type_symbol = table.ultimate_symbol(table.derived(derived).type_symbol);
    let name = table.name_str(type_symbol.name);
    if name != "event_type" && name != "lock_type" {
        return false;
    }
    let owner = table.scope(type_symbol.owner);
    owner.kind == ScopeKind::Module
        && table
            .try_parent(type_symbol.owner)
            .is_some_and(|parent| table.scope(parent).kind == ScopeKind::IntrinsicModules)
}

/// Variable of EVENT_TYPE or LOCK_TYPE, or with such a potential component
pub fn is_or_contains_event_or_lock_component(table: &SymbolTable, original: SymbolId) -> bool {
    let symbol = resolve_associations(table, original, true);
    if !is_variable(table, symbol) {
        return false;
    }
    let Some(derived) = table.symbol_type(symbol).and_then(DeclTypeSpec::as_derived) else {
        return false;
    };
    is_event_type_or_lock_type(table, Some(derived))
        || find_event_or_lock_potential_component(table, derived, false).is_some()
}
