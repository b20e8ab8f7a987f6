//! Traversal of the component graph of derived types
//!
//! A [`ComponentIterator`] is parameterized by a traversal kind that decides
//! which components are yielded and which are descended into:
//!
//! - [`Ordered`]: components in declaration order, with the components of
//!   the parent type yielded before the parent component itself.
//! - [`Direct`]: every component, descending into non-allocatable,
//!   non-pointer components of derived type.
//! - [`Ultimate`]: components of intrinsic type, allocatables, pointers and
//!   procedure components; other components are descended into but not
//!   yielded.
//! - [`Potential`]: non-pointer components, descending into allocatables.
//! - [`PotentialAndPointer`]: like [`Potential`] but pointers are yielded.
//! - [`ScopeOrder`]: every symbol of each type scope in insertion order,
//!   including bindings and type parameters.
//!
//! Type graphs may be cyclic through allocatable or pointer components; a
//! type already on the current path is never descended into again.

use std::marker::PhantomData;

use crate::symbols::{DeclTypeSpec, DerivedTypeId, Details, Name, ScopeId, SymbolFlags, SymbolId, SymbolTable};

use super::derived::is_event_type_or_lock_type;
use super::predicates::{
    is_allocatable, is_allocatable_or_object_pointer, is_allocatable_or_pointer, is_coarray, is_pointer,
    is_polymorphic_allocatable,
};

/// Runtime view of a traversal kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Ordered,
    Direct,
    Ultimate,
    Potential,
    Scope,
    PotentialAndPointer,
}

mod sealed {
    pub trait Sealed {}
}

/// Marker type selecting a [`ComponentKind`]
pub trait TraversalKind: sealed::Sealed {
    const KIND: ComponentKind;
}

macro_rules! traversal_kinds {
    ($($(#[$meta:meta])* $marker:ident => $kind:ident;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $marker;

            impl sealed::Sealed for $marker {}

            impl TraversalKind for $marker {
                const KIND: ComponentKind = ComponentKind::$kind;
            }
        )*
    };
}

traversal_kinds! {
    Ordered => Ordered;
    Direct => Direct;
    Ultimate => Ultimate;
    Potential => Potential;
    /// Symbols of each type scope in insertion order
    ScopeOrder => Scope;
    PotentialAndPointer => PotentialAndPointer;
}

pub type OrderedComponentIterator<'a> = ComponentIterator<'a, Ordered>;
pub type DirectComponentIterator<'a> = ComponentIterator<'a, Direct>;
pub type UltimateComponentIterator<'a> = ComponentIterator<'a, Ultimate>;
pub type PotentialComponentIterator<'a> = ComponentIterator<'a, Potential>;
pub type ScopeComponentIterator<'a> = ComponentIterator<'a, ScopeOrder>;
pub type PotentialAndPointerComponentIterator<'a> = ComponentIterator<'a, PotentialAndPointer>;

/// The components of a derived type, enumerable any number of times
#[derive(Debug)]
pub struct ComponentIterator<'a, K> {
    table: &'a SymbolTable,
    derived: DerivedTypeId,
    kind: PhantomData<K>,
}

impl<K> Clone for ComponentIterator<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for ComponentIterator<'_, K> {}

impl<'a, K: TraversalKind> ComponentIterator<'a, K> {
    pub fn new(table: &'a SymbolTable, derived: DerivedTypeId) -> Self {
        Self { table, derived, kind: PhantomData }
    }

    /// Start a fresh traversal
    pub fn iter(&self) -> ComponentCursor<'a, K> {
        ComponentCursor {
            table: self.table,
            path: vec![Frame::new(self.table, self.derived, K::KIND)],
            kind: PhantomData,
        }
    }

    /// First component satisfying `predicate`, with its path
    pub fn find(&self, mut predicate: impl FnMut(SymbolId) -> bool) -> Option<ComponentMatch> {
        let mut cursor = self.iter();
        while let Some(component) = cursor.next() {
            if predicate(component) {
                return Some(ComponentMatch { component, path: cursor.component_path() });
            }
        }
        None
    }
}

impl<'a, K: TraversalKind> IntoIterator for ComponentIterator<'a, K> {
    type Item = SymbolId;
    type IntoIter = ComponentCursor<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K: TraversalKind> IntoIterator for &ComponentIterator<'a, K> {
    type Item = SymbolId;
    type IntoIter = ComponentCursor<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One level of the traversal: a type being enumerated
#[derive(Debug, Clone)]
struct Frame<'a> {
    type_symbol: SymbolId,
    scope: Option<ScopeId>,
    /// Component names in declaration order
    names: &'a [Name],
    /// Symbols of the type scope by name, for scope-order traversal
    symbols: Vec<SymbolId>,
    cursor: usize,
    component: Option<SymbolId>,
    descended: bool,
    visited: bool,
}

impl<'a> Frame<'a> {
    fn new(table: &'a SymbolTable, derived: DerivedTypeId, kind: ComponentKind) -> Self {
        let type_symbol = table.derived(derived).type_symbol;
        let scope = table.derived_scope(derived);
        let names = table
            .symbol(type_symbol)
            .details
            .as_derived_type()
            .map_or(&[][..], |details| details.component_names.as_slice());
        let symbols = match scope {
            Some(scope) if kind == ComponentKind::Scope => table.symbols_by_name(scope),
            _ => Vec::new(),
        };
        Self {
            type_symbol,
            scope,
            names,
            symbols,
            cursor: 0,
            component: None,
            descended: false,
            visited: false,
        }
    }
}

/// A traversal in progress
#[derive(Debug, Clone)]
pub struct ComponentCursor<'a, K> {
    table: &'a SymbolTable,
    path: Vec<Frame<'a>>,
    kind: PhantomData<K>,
}

impl<K: TraversalKind> ComponentCursor<'_, K> {
    /// Components from the traversed type down to the current component
    pub fn component_path(&self) -> Vec<SymbolId> {
        self.path.iter().filter_map(|frame| frame.component).collect()
    }

    /// Designator of the current component relative to an object of the
    /// traversed type, such as `%a%b`
    pub fn designator_name(&self) -> String {
        designator(self.table, &self.component_path())
    }

    /// Derived type to descend into from `component`, if any
    fn plan_component_traversal(&self, component: SymbolId) -> Option<DerivedTypeId> {
        let table = self.table;
        let symbol = table.symbol(component);
        let derived = symbol.details.as_object()?.ty.as_ref()?.as_derived()?;
        let traverse = match K::KIND {
            ComponentKind::Ordered => symbol.test(SymbolFlags::PARENT_COMP),
            ComponentKind::Direct | ComponentKind::Ultimate | ComponentKind::Scope => {
                !is_allocatable_or_object_pointer(table, component)
            }
            ComponentKind::Potential | ComponentKind::PotentialAndPointer => !is_pointer(table, component),
        };
        if !traverse {
            return None;
        }
        let type_symbol = table.derived(derived).type_symbol;
        if self.path.iter().any(|frame| frame.type_symbol == type_symbol) {
            tracing::trace!(
                component = table.symbol_name(component),
                ty = table.symbol_name(type_symbol),
                "component type already on the traversal path"
            );
            return None;
        }
        Some(derived)
    }

    /// Advance to the next component to yield
    fn increment(&mut self) {
        let table = self.table;
        while let Some(last) = self.path.len().checked_sub(1) {
            let deepest = &self.path[last];
            if let Some(component) = deepest.component {
                if !deepest.descended {
                    self.path[last].descended = true;
                    if let Some(derived) = self.plan_component_traversal(component) {
                        self.path.push(Frame::new(table, derived, K::KIND));
                        continue;
                    }
                } else if !deepest.visited {
                    // yielded after its subcomponents
                    self.path[last].visited = true;
                    return;
                }
            }
            let deepest = &mut self.path[last];
            if K::KIND == ComponentKind::Scope {
                let Some(&component) = deepest.symbols.get(deepest.cursor) else {
                    self.path.pop();
                    continue;
                };
                deepest.cursor += 1;
                deepest.component = Some(component);
                deepest.descended = false;
                deepest.visited = true;
                return;
            }
            let Some(&name) = deepest.names.get(deepest.cursor) else {
                self.path.pop();
                continue;
            };
            deepest.cursor += 1;
            let Some(component) = deepest.scope.and_then(|scope| table.scope(scope).find(name)) else {
                continue;
            };
            deepest.component = Some(component);
            deepest.descended = false;
            if stop_at_component_pre(K::KIND, table, component) {
                deepest.visited = true;
                return;
            }
            deepest.visited = !stop_at_component_post(K::KIND, table, component);
        }
    }
}

impl<K: TraversalKind> Iterator for ComponentCursor<'_, K> {
    type Item = SymbolId;

    fn next(&mut self) -> Option<SymbolId> {
        self.increment();
        self.path.last().and_then(|frame| frame.component)
    }
}

/// Whether a component is yielded before its subcomponents
fn stop_at_component_pre(kind: ComponentKind, table: &SymbolTable, component: SymbolId) -> bool {
    let symbol = table.symbol(component);
    match kind {
        // parent components follow their own subcomponents
        ComponentKind::Ordered => !symbol.test(SymbolFlags::PARENT_COMP),
        ComponentKind::Direct | ComponentKind::PotentialAndPointer => true,
        ComponentKind::Ultimate => {
            matches!(symbol.details, Details::ProcEntity(_))
                || is_allocatable_or_object_pointer(table, component)
                || symbol
                    .details
                    .as_object()
                    .and_then(|object| object.ty.as_ref())
                    .is_some_and(DeclTypeSpec::is_intrinsic)
        }
        ComponentKind::Potential => !is_pointer(table, component),
        ComponentKind::Scope => crate::common::die("scope-order traversal has no component filter"),
    }
}

/// Whether a component is yielded after its subcomponents
fn stop_at_component_post(kind: ComponentKind, table: &SymbolTable, component: SymbolId) -> bool {
    kind == ComponentKind::Ordered && table.symbol(component).test(SymbolFlags::PARENT_COMP)
}

fn designator(table: &SymbolTable, path: &[SymbolId]) -> String {
    path.iter().map(|&component| format!("%{}", table.symbol_name(component))).collect()
}

/// A component found by a search, with the path that leads to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMatch {
    pub component: SymbolId,
    /// Components from the searched type down to `component`
    pub path: Vec<SymbolId>,
}

impl ComponentMatch {
    pub fn designator_name(&self, table: &SymbolTable) -> String {
        designator(table, &self.path)
    }
}

pub fn find_coarray_potential_component(table: &SymbolTable, derived: DerivedTypeId) -> Option<ComponentMatch> {
    PotentialComponentIterator::new(table, derived).find(|component| is_coarray(table, component))
}

pub fn find_pointer_potential_component(table: &SymbolTable, derived: DerivedTypeId) -> Option<ComponentMatch> {
    PotentialAndPointerComponentIterator::new(table, derived).find(|component| is_pointer(table, component))
}

pub fn find_coarray_ultimate_component(table: &SymbolTable, derived: DerivedTypeId) -> Option<ComponentMatch> {
    UltimateComponentIterator::new(table, derived).find(|component| is_coarray(table, component))
}

pub fn find_pointer_ultimate_component(table: &SymbolTable, derived: DerivedTypeId) -> Option<ComponentMatch> {
    UltimateComponentIterator::new(table, derived).find(|component| is_pointer(table, component))
}

/// A potential component of EVENT_TYPE or LOCK_TYPE; with
/// `ignore_coarrays`, those reached through a coarray component are skipped
pub fn find_event_or_lock_potential_component(
    table: &SymbolTable,
    derived: DerivedTypeId,
    ignore_coarrays: bool,
) -> Option<ComponentMatch> {
    let mut cursor = PotentialComponentIterator::new(table, derived).iter();
    while let Some(component) = cursor.next() {
        let component_type = table
            .symbol(component)
            .details
            .as_object()
            .and_then(|object| object.ty.as_ref())
            .and_then(DeclTypeSpec::as_derived);
        if !is_event_type_or_lock_type(table, component_type) {
            continue;
        }
        let path = cursor.component_path();
        let enclosing = &path[..path.len().saturating_sub(1)];
        if !ignore_coarrays || !enclosing.iter().any(|&outer| is_coarray(table, outer)) {
            return Some(ComponentMatch { component, path });
        }
    }
    None
}

pub fn find_allocatable_ultimate_component(table: &SymbolTable, derived: DerivedTypeId) -> Option<ComponentMatch> {
    UltimateComponentIterator::new(table, derived).find(|component| is_allocatable(table, component))
}

pub fn find_allocatable_or_pointer_direct_component(
    table: &SymbolTable,
    derived: DerivedTypeId,
) -> Option<ComponentMatch> {
    DirectComponentIterator::new(table, derived).find(|component| is_allocatable_or_pointer(table, component))
}

pub fn find_polymorphic_allocatable_potential_component(
    table: &SymbolTable,
    derived: DerivedTypeId,
) -> Option<ComponentMatch> {
    PotentialComponentIterator::new(table, derived).find(|component| is_polymorphic_allocatable(table, component))
}

pub fn find_ultimate_component(
    table: &SymbolTable,
    derived: DerivedTypeId,
    predicate: impl FnMut(SymbolId) -> bool,
) -> Option<SymbolId> {
    UltimateComponentIterator::new(table, derived)
        .find(predicate)
        .map(|found| found.component)
}

/// `symbol` itself when it satisfies `predicate`, otherwise the first
/// ultimate component of its derived type that does
pub fn find_ultimate_component_of_symbol(
    table: &SymbolTable,
    symbol: SymbolId,
    mut predicate: impl FnMut(SymbolId) -> bool,
) -> Option<SymbolId> {
    if predicate(symbol) {
        return Some(symbol);
    }
    let derived = table
        .symbol(symbol)
        .details
        .as_object()?
        .ty
        .as_ref()?
        .as_derived()?;
    find_ultimate_component(table, derived, predicate)
}

/// First symbol of the type scope satisfying `predicate`, continuing into
/// the parent type's scope
pub fn find_immediate_component(
    table: &SymbolTable,
    derived: DerivedTypeId,
    mut predicate: impl FnMut(SymbolId) -> bool,
) -> Option<SymbolId> {
    let mut current = derived;
    loop {
        let scope = table.derived_scope(current)?;
        let mut parent = None;
        for symbol in table.symbols_by_name(scope) {
            if predicate(symbol) {
                return Some(symbol);
            }
            if table.symbol(symbol).test(SymbolFlags::PARENT_COMP) {
                parent = Some(symbol);
            }
        }
        current = table
            .symbol(parent?)
            .details
            .as_object()?
            .ty
            .as_ref()?
            .as_derived()?;
    }
}

pub fn has_allocatable_direct_component(table: &SymbolTable, derived: DerivedTypeId) -> bool {
    DirectComponentIterator::new(table, derived)
        .into_iter()
        .any(|component| is_allocatable(table, component))
}
