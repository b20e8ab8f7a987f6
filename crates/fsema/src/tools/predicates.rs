//! Kind predicates over symbols
//!
//! Predicates that describe what an entity *is* look through use and host
//! association to the defining symbol; those that describe how an entity is
//! *declared here* (initializers, function results) inspect the symbol given.

use crate::evaluate::TypeCategory;
use crate::semantics::SemanticsContext;
use crate::symbols::{Attrs, DeclTypeSpec, Details, MiscKind, ParamValue, ScopeId, ScopeKind, SymbolFlags, SymbolId, SymbolTable};

use super::association::{get_association_root, resolve_associations};
use super::cuda::can_cuda_symbol_be_global;
use super::derived::{has_default_initialization, has_destruction};

pub fn is_procedure(table: &SymbolTable, symbol: SymbolId) -> bool {
    matches!(
        table.ultimate_symbol(symbol).details,
        Details::Subprogram(_)
            | Details::SubprogramName(_)
            | Details::ProcEntity(_)
            | Details::Generic(_)
            | Details::ProcBinding(_)
    )
}

pub fn is_pointer(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.ultimate_symbol(symbol).has(Attrs::POINTER)
}

pub fn is_allocatable(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.ultimate_symbol(symbol).has(Attrs::ALLOCATABLE)
}

pub fn is_allocatable_or_pointer(table: &SymbolTable, symbol: SymbolId) -> bool {
    is_allocatable(table, symbol) || is_pointer(table, symbol)
}

pub fn is_object_pointer(table: &SymbolTable, symbol: SymbolId) -> bool {
    is_pointer(table, symbol) && !is_procedure(table, symbol)
}

pub fn is_allocatable_or_object_pointer(table: &SymbolTable, symbol: SymbolId) -> bool {
    is_allocatable(table, symbol) || is_object_pointer(table, symbol)
}

pub fn is_procedure_pointer(table: &SymbolTable, symbol: SymbolId) -> bool {
    let root = get_association_root(table, symbol, false);
    is_pointer(table, root) && is_procedure(table, root)
}

pub fn is_named_constant(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.ultimate_symbol(symbol).has(Attrs::PARAMETER)
}

/// Dummy argument, looking through construct association
pub fn is_dummy(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.symbol(resolve_associations(table, symbol, false)).is_dummy()
}

pub fn is_pointer_dummy(table: &SymbolTable, symbol: SymbolId) -> bool {
    is_pointer(table, symbol) && is_dummy(table, symbol)
}

pub fn is_function_result(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.symbol(symbol).is_func_result()
}

pub fn is_function(table: &SymbolTable, symbol: SymbolId) -> bool {
    let ultimate = table.ultimate_symbol(symbol);
    if ultimate.test(SymbolFlags::FUNCTION) {
        return true;
    }
    if ultimate.test(SymbolFlags::SUBROUTINE) {
        return false;
    }
    match &ultimate.details {
        Details::Subprogram(details) => details.is_function(),
        Details::ProcEntity(details) => {
            details.ty.is_some() || details.interface.is_some_and(|interface| is_function(table, interface))
        }
        Details::ProcBinding(details) => is_function(table, details.symbol),
        _ => false,
    }
}

pub fn is_function_scope(table: &SymbolTable, scope: ScopeId) -> bool {
    table.scope(scope).symbol.is_some_and(|symbol| is_function(table, symbol))
}

pub fn is_intent_in(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.symbol(symbol).has(Attrs::INTENT_IN)
}

pub fn is_intent_out(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.symbol(symbol).has(Attrs::INTENT_OUT)
}

pub fn is_intent_inout(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.symbol(symbol).has(Attrs::INTENT_INOUT)
}

pub fn is_optional(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.symbol(symbol).has(Attrs::OPTIONAL)
}

/// The subprogram an ENTRY belongs to, or the symbol itself
pub fn get_main_entry(table: &SymbolTable, symbol: SymbolId) -> SymbolId {
    table
        .symbol(symbol)
        .details
        .as_subprogram()
        .and_then(|details| details.entry_scope)
        .and_then(|scope| table.scope(scope).symbol)
        .unwrap_or(symbol)
}

pub fn is_pure_procedure(table: &SymbolTable, symbol: SymbolId) -> bool {
    let symbol = get_main_entry(table, table.ultimate(symbol));
    match &table.symbol(symbol).details {
        Details::ProcEntity(details) => {
            if let Some(interface) = details.interface {
                return is_pure_procedure(table, interface);
            }
        }
        Details::ProcBinding(details) => return is_pure_procedure(table, details.symbol),
        _ if !is_procedure(table, symbol) => return false,
        _ => {}
    }
    if is_stmt_function(table, symbol) {
        return true;
    }
    let symbol = table.symbol(symbol);
    symbol.has(Attrs::PURE) || (symbol.has(Attrs::ELEMENTAL) && !symbol.has(Attrs::IMPURE))
}

pub fn is_pure_procedure_scope(table: &SymbolTable, scope: ScopeId) -> bool {
    table.scope(scope).symbol.is_some_and(|symbol| is_pure_procedure(table, symbol))
}

pub fn is_elemental_procedure(table: &SymbolTable, symbol: SymbolId) -> bool {
    let symbol = get_main_entry(table, table.ultimate(symbol));
    if !is_procedure(table, symbol) {
        return false;
    }
    match &table.symbol(symbol).details {
        Details::ProcEntity(details) => details
            .interface
            .is_some_and(|interface| is_elemental_procedure(table, interface)),
        Details::ProcBinding(details) => is_elemental_procedure(table, details.symbol),
        _ => table.symbol(symbol).has(Attrs::ELEMENTAL),
    }
}

pub fn is_coarray(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.ultimate_symbol(symbol).corank() > 0
}

pub fn is_assumed_rank(table: &SymbolTable, symbol: SymbolId) -> bool {
    let symbol = resolve_associations(table, symbol, false);
    table
        .symbol(symbol)
        .details
        .as_object()
        .is_some_and(|object| object.shape.is_assumed_rank())
}

pub fn is_polymorphic(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.symbol_type(symbol).is_some_and(DeclTypeSpec::is_polymorphic)
}

pub fn is_unlimited_polymorphic(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.symbol_type(symbol).is_some_and(DeclTypeSpec::is_unlimited_polymorphic)
}

pub fn is_assumed_type(table: &SymbolTable, symbol: SymbolId) -> bool {
    table.symbol_type(symbol).is_some_and(DeclTypeSpec::is_assumed_type)
}

pub fn is_polymorphic_allocatable(table: &SymbolTable, symbol: SymbolId) -> bool {
    is_allocatable(table, symbol) && is_polymorphic(table, symbol)
}

/// Data object that may be defined: not a named constant nor an expression
pub fn is_variable(table: &SymbolTable, symbol: SymbolId) -> bool {
    let symbol = resolve_associations(table, symbol, false);
    let symbol = table.symbol(symbol);
    matches!(symbol.details, Details::Object(_)) && !symbol.has(Attrs::PARAMETER)
}

pub fn is_stmt_function(table: &SymbolTable, symbol: SymbolId) -> bool {
    table
        .ultimate_symbol(symbol)
        .details
        .as_subprogram()
        .is_some_and(|details| details.stmt_function)
}

pub fn is_in_stmt_function(table: &SymbolTable, symbol: SymbolId) -> bool {
    let owner = table.symbol(symbol).owner;
    table.scope(owner).symbol.is_some_and(|function| is_stmt_function(table, function))
}

pub fn is_stmt_function_dummy(table: &SymbolTable, symbol: SymbolId) -> bool {
    is_dummy(table, symbol) && is_in_stmt_function(table, symbol)
}

pub fn is_stmt_function_result(table: &SymbolTable, symbol: SymbolId) -> bool {
    is_function_result(table, symbol) && is_in_stmt_function(table, symbol)
}

pub fn is_bind_c_procedure(table: &SymbolTable, symbol: SymbolId) -> bool {
    let ultimate = table.ultimate(symbol);
    if let Details::ProcEntity(details) = &table.symbol(ultimate).details
        && let Some(interface) = details.interface
    {
        // procedure component or pointer with a BIND(C) interface
        return is_bind_c_procedure(table, interface);
    }
    table.symbol(ultimate).has(Attrs::BIND_C) && is_procedure(table, ultimate)
}

pub fn is_bind_c_procedure_scope(table: &SymbolTable, scope: ScopeId) -> bool {
    table.scope(scope).symbol.is_some_and(|symbol| is_bind_c_procedure(table, symbol))
}

pub fn is_separate_module_procedure_interface(table: &SymbolTable, symbol: Option<SymbolId>) -> bool {
    let Some(symbol) = symbol else {
        return false;
    };
    let symbol = table.symbol(symbol);
    symbol.has(Attrs::MODULE) && symbol.details.as_subprogram().is_some_and(|details| details.is_interface)
}

pub fn is_assumed_length_character(table: &SymbolTable, symbol: SymbolId) -> bool {
    table
        .symbol_type(symbol)
        .and_then(DeclTypeSpec::character_length)
        .is_some_and(|length| length.is_assumed())
}

pub fn find_common_block_containing(table: &SymbolTable, symbol: SymbolId) -> Option<SymbolId> {
    let root = get_association_root(table, symbol, false);
    table.symbol(root).details.as_object().and_then(|object| object.common_block)
}

pub fn is_common_block_containing(table: &SymbolTable, block: SymbolId, object: SymbolId) -> bool {
    table
        .symbol(block)
        .details
        .as_common_block()
        .is_some_and(|details| details.objects.contains(&object))
}

pub fn is_in_blank_common(table: &SymbolTable, symbol: SymbolId) -> bool {
    find_common_block_containing(table, symbol).is_some_and(|block| table.symbol_name(block).is_empty())
}

pub fn has_declaration_initializer(table: &SymbolTable, symbol: SymbolId) -> bool {
    if is_named_constant(table, symbol) {
        return false;
    }
    match &table.symbol(symbol).details {
        Details::Object(object) => object.has_init,
        Details::ProcEntity(proc) => proc.has_init,
        _ => false,
    }
}

/// Whether an entity has an initial value, optionally disregarding DATA
/// statements, allocatables (initially unallocated) and pointers
pub fn is_initialized(
    table: &SymbolTable,
    symbol: SymbolId,
    ignore_data_statements: bool,
    ignore_allocatable: bool,
    ignore_pointer: bool,
) -> bool {
    if !ignore_allocatable && is_allocatable(table, symbol) {
        return true;
    }
    if !ignore_data_statements && table.symbol(symbol).test(SymbolFlags::IN_DATA_STMT) {
        return true;
    }
    if has_declaration_initializer(table, symbol) {
        return true;
    }
    if is_pointer(table, symbol) {
        return !ignore_pointer;
    }
    if is_named_constant(table, symbol) {
        return false;
    }
    if let Some(object) = table.symbol(symbol).details.as_object()
        && (!object.is_dummy || is_intent_out(table, symbol))
        && let Some(spec) = object.ty.as_ref().and_then(DeclTypeSpec::as_derived)
    {
        return has_default_initialization(table, spec, ignore_allocatable, ignore_pointer);
    }
    false
}

/// Whether an entity needs deallocation or finalization when it goes away.
/// Components whose type is `derived_type_symbol` are not examined again.
pub fn is_destructible(table: &SymbolTable, symbol: SymbolId, derived_type_symbol: Option<SymbolId>) -> bool {
    if is_allocatable(table, symbol) || is_automatic(table, symbol) {
        return true;
    }
    if is_named_constant(table, symbol) || is_function_result(table, symbol) || is_pointer(table, symbol) {
        return false;
    }
    if let Some(object) = table.symbol(symbol).details.as_object()
        && (!object.is_dummy || is_intent_out(table, symbol))
        && let Some(spec) = object.ty.as_ref().and_then(DeclTypeSpec::as_derived)
    {
        return Some(table.derived(spec).type_symbol) != derived_type_symbol && has_destruction(table, spec);
    }
    false
}

/// Local object whose size or type parameters depend on non-constant
/// specification expressions
pub fn is_automatic(table: &SymbolTable, symbol: SymbolId) -> bool {
    let ultimate = table.ultimate(symbol);
    let Some(object) = table.symbol(ultimate).details.as_object() else {
        return false;
    };
    if object.is_dummy || is_allocatable(table, ultimate) || is_pointer(table, ultimate) {
        return false;
    }
    let non_constant_type = match &object.ty {
        Some(DeclTypeSpec::Character { length, .. }) => *length == ParamValue::NonConstant,
        Some(DeclTypeSpec::TypeDerived(spec) | DeclTypeSpec::ClassDerived(spec)) => table
            .derived(*spec)
            .parameters
            .iter()
            .any(|(_, value)| *value == ParamValue::NonConstant),
        _ => false,
    };
    non_constant_type || object.shape.has_non_constant_extent()
}

/// Whether an entity has the SAVE attribute, explicitly or implied
pub fn is_saved(context: &SemanticsContext, symbol: SymbolId) -> bool {
    let table = context.table();
    let root = get_association_root(table, symbol, false);
    let sym = table.symbol(root);
    let scope_kind = table.scope(sym.owner).kind;
    if matches!(sym.details, Details::AssocEntity(_)) || scope_kind == ScopeKind::DerivedType {
        return false;
    }
    if sym.has(Attrs::SAVE) {
        return true;
    }
    if is_dummy(table, root)
        || is_function_result(table, root)
        || is_automatic(table, root)
        || is_named_constant(table, root)
    {
        return false;
    }
    if scope_kind == ScopeKind::Module
        || (scope_kind == ScopeKind::MainProgram
            && (sym.has(Attrs::TARGET) || is_coarray(table, root))
            && can_cuda_symbol_be_global(context, root))
    {
        return true;
    }
    if sym.test(SymbolFlags::IN_DATA_STMT) || has_declaration_initializer(table, root) {
        return true;
    }
    find_common_block_containing(table, root).is_some_and(|block| table.symbol(block).has(Attrs::SAVE))
}

/// Local object that is deallocated or finalized on return from its scope
pub fn is_automatically_destroyed(context: &SemanticsContext, symbol: SymbolId) -> bool {
    let table = context.table();
    let sym = table.symbol(symbol);
    matches!(sym.details, Details::Object(_))
        && matches!(table.scope(sym.owner).kind, ScopeKind::Subprogram | ScopeKind::BlockConstruct)
        && !is_named_constant(table, symbol)
        && (!is_dummy(table, symbol) || is_intent_out(table, symbol))
        && !is_pointer(table, symbol)
        && !is_saved(context, symbol)
        && find_common_block_containing(table, symbol).is_none()
}

/// Entity whose name is also the name of an intrinsic type
pub fn has_intrinsic_type_name(table: &SymbolTable, symbol: SymbolId) -> bool {
    let name = table.symbol_name(symbol);
    name == "doubleprecision"
        || TypeCategory::from_keyword(name).is_some_and(|category| category != TypeCategory::Derived)
}

pub fn is_generic_defined_op(table: &SymbolTable, symbol: SymbolId) -> bool {
    match &table.ultimate_symbol(symbol).details {
        Details::Generic(generic) => generic.kind.is_defined_operator(),
        Details::Misc(misc) => misc.kind == MiscKind::TypeBoundDefinedOp,
        _ => false,
    }
}

/// Whether a procedure may be bound to a type (C769)
pub fn can_be_type_bound_proc(table: &SymbolTable, symbol: SymbolId) -> bool {
    if is_dummy(table, symbol) || is_procedure_pointer(table, symbol) {
        return false;
    }
    let sym = table.symbol(symbol);
    let in_module = table.scope(sym.owner).kind == ScopeKind::Module;
    match &sym.details {
        Details::SubprogramName(_) => in_module,
        Details::Subprogram(details) if details.is_interface => !sym.has(Attrs::ABSTRACT),
        Details::Subprogram(_) => in_module,
        Details::ProcEntity(proc) => !sym.has(Attrs::INTRINSIC) && proc.has_explicit_interface(),
        _ => false,
    }
}

pub fn has_alternate_returns(table: &SymbolTable, subprogram: SymbolId) -> bool {
    table
        .symbol(subprogram)
        .details
        .as_subprogram()
        .is_some_and(|details| details.dummy_args.iter().any(Option::is_none))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_str;
    use crate::semantics::LanguageFeatures;
    use crate::tools::testing::{context_for, symbol_named};

    #[test]
    fn test_pointer_and_allocatable_through_use() {
        let table = load_str(
            "module m { real, pointer :: p; real, allocatable :: a(:); procedure(f), pointer :: pp
                        real function f(x) { real :: x } }
             program main { use m }",
        )
        .unwrap();
        let main_p = table
            .symbol_ids()
            .find(|&id| table.symbol_name(id) == "p" && matches!(table.symbol(id).details, Details::Use(_)))
            .unwrap();
        assert!(is_pointer(&table, main_p));
        assert!(is_object_pointer(&table, main_p));
        assert!(!is_procedure_pointer(&table, main_p));
        let pp = symbol_named(&table, "pp");
        assert!(is_procedure_pointer(&table, pp));
        assert!(!is_allocatable_or_object_pointer(&table, pp));
        assert!(is_function(&table, pp));
        assert!(is_allocatable(&table, symbol_named(&table, "a")));
    }

    #[test]
    fn test_purity_and_elemental() {
        let table = load_str(
            "module m {
               pure subroutine ps(x) { integer, intent(in) :: x }
               elemental subroutine es(x) { integer, intent(in) :: x }
               impure elemental subroutine ies(x) { integer, intent(in) :: x }
               subroutine plain() { }
               procedure(ps) :: ref
             }",
        )
        .unwrap();
        assert!(is_pure_procedure(&table, symbol_named(&table, "ps")));
        assert!(is_pure_procedure(&table, symbol_named(&table, "es")));
        assert!(!is_pure_procedure(&table, symbol_named(&table, "ies")));
        assert!(!is_pure_procedure(&table, symbol_named(&table, "plain")));
        assert!(is_pure_procedure(&table, symbol_named(&table, "ref")));
        assert!(is_elemental_procedure(&table, symbol_named(&table, "ies")));
        assert!(!is_elemental_procedure(&table, symbol_named(&table, "ps")));
    }

    #[test]
    fn test_alternate_returns_and_stmt_functions() {
        let table = load_str(
            "subroutine s(a, *) { integer :: a; stmtfunc g(y) }
             subroutine t(a) { integer :: a }",
        )
        .unwrap();
        assert!(has_alternate_returns(&table, symbol_named(&table, "s")));
        assert!(!has_alternate_returns(&table, symbol_named(&table, "t")));
        let g = symbol_named(&table, "g");
        assert!(is_stmt_function(&table, g));
        assert!(is_pure_procedure(&table, g));
        assert!(is_stmt_function_dummy(&table, symbol_named(&table, "y")));
    }

    #[test]
    fn test_initialization_and_destruction() {
        let context = context_for(
            "module m {
               type :: t { integer :: i = 0 }
               type :: u { real, allocatable :: a(:) }
               subroutine s(n, d) {
                 integer :: n
                 type(t), intent(out) :: d
                 type(t) :: local
                 type(u) :: owner
                 real :: work(n)
                 real, save :: kept(n)
                 integer, parameter :: k = 3
               }
             }",
            LanguageFeatures::default(),
        );
        let table = context.table();
        assert!(is_initialized(table, symbol_named(table, "d"), false, false, false));
        assert!(is_initialized(table, symbol_named(table, "local"), false, false, false));
        assert!(!is_initialized(table, symbol_named(table, "k"), false, false, false));
        assert!(is_automatic(table, symbol_named(table, "work")));
        assert!(is_destructible(table, symbol_named(table, "work"), None));
        assert!(is_destructible(table, symbol_named(table, "owner"), None));
        assert!(!is_destructible(table, symbol_named(table, "local"), None));
        assert!(is_automatically_destroyed(&context, symbol_named(table, "owner")));
        assert!(!is_automatically_destroyed(&context, symbol_named(table, "n")));
        assert!(is_saved(&context, symbol_named(table, "kept")));
        assert!(!is_saved(&context, symbol_named(table, "local")));
    }

    #[test]
    fn test_module_variables_are_saved() {
        let context = context_for(
            "module m { integer :: counter; integer, parameter :: limit = 10 }
             program main { integer, target :: buffer; integer :: scratch }",
            LanguageFeatures::default(),
        );
        let table = context.table();
        assert!(is_saved(&context, symbol_named(table, "counter")));
        assert!(!is_saved(&context, symbol_named(table, "limit")));
        assert!(is_saved(&context, symbol_named(table, "buffer")));
        assert!(!is_saved(&context, symbol_named(table, "scratch")));
    }

    #[test]
    fn test_type_bound_eligibility() {
        let table = load_str(
            "module m {
               subroutine good(x) { real :: x }
               abstract interface { subroutine abs_iface(x) { real :: x } }
               interface { subroutine concrete_iface(x) { real :: x } }
               procedure(good), pointer :: ptr
             }",
        )
        .unwrap();
        assert!(can_be_type_bound_proc(&table, symbol_named(&table, "good")));
        assert!(!can_be_type_bound_proc(&table, symbol_named(&table, "abs_iface")));
        assert!(can_be_type_bound_proc(&table, symbol_named(&table, "concrete_iface")));
        assert!(!can_be_type_bound_proc(&table, symbol_named(&table, "ptr")));
    }

    #[test]
    fn test_intrinsic_type_names() {
        let table = load_str("program main { integer :: real, doubleprecision, derived, value }").unwrap();
        assert!(has_intrinsic_type_name(&table, symbol_named(&table, "real")));
        assert!(has_intrinsic_type_name(&table, symbol_named(&table, "doubleprecision")));
        assert!(!has_intrinsic_type_name(&table, symbol_named(&table, "derived")));
        assert!(!has_intrinsic_type_name(&table, symbol_named(&table, "value")));
    }

    #[test]
    fn test_common_membership() {
        let table = load_str(
            "program main {
               integer :: a, b, c
               common // a
               common /named/ b
             }",
        )
        .unwrap();
        assert!(is_in_blank_common(&table, symbol_named(&table, "a")));
        assert!(!is_in_blank_common(&table, symbol_named(&table, "b")));
        assert!(find_common_block_containing(&table, symbol_named(&table, "c")).is_none());
        let block = find_common_block_containing(&table, symbol_named(&table, "b")).unwrap();
        assert!(is_common_block_containing(&table, block, symbol_named(&table, "b")));
    }
}
