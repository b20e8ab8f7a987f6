//! Semantic queries over a resolved program
//!
//! Every query reads the [`SymbolTable`](crate::symbols::SymbolTable) (or a
//! [`SemanticsContext`](crate::semantics::SemanticsContext) when it needs
//! language features or reports messages). The only mutations are the
//! derived-type instantiation cache and error flags on symbols.

mod association;
mod compat;
mod components;
mod cuda;
mod derived;
mod expr;
mod image_control;
mod labels;
mod names;
mod predicates;
mod procedures;
mod scopes;
mod storage;

pub use association::{
    bypass_generic, check_accessible_symbol, find_equivalence_set, find_externally_visible_object,
    get_association_root, get_cray_pointer, is_accessible, is_host_associated, is_host_associated_into_subprogram,
    is_use_associated, resolve_associations,
};
pub use compat::{
    expr_has_type_category, expr_type_kind_is_default, is_defined_assignment, is_intrinsic_concat,
    is_intrinsic_logical, is_intrinsic_logical_binary, is_intrinsic_numeric, is_intrinsic_numeric_binary,
    is_intrinsic_relational,
};
pub use components::{
    ComponentCursor, ComponentIterator, ComponentKind, ComponentMatch, Direct, DirectComponentIterator, Ordered,
    OrderedComponentIterator, Potential, PotentialAndPointer, PotentialAndPointerComponentIterator,
    PotentialComponentIterator, ScopeComponentIterator, ScopeOrder, TraversalKind, Ultimate,
    UltimateComponentIterator, find_allocatable_or_pointer_direct_component, find_allocatable_ultimate_component,
    find_coarray_potential_component, find_coarray_ultimate_component, find_event_or_lock_potential_component,
    find_immediate_component, find_pointer_potential_component, find_pointer_ultimate_component,
    find_polymorphic_allocatable_potential_component, find_ultimate_component, find_ultimate_component_of_symbol,
    has_allocatable_direct_component,
};
pub use cuda::{
    can_cuda_symbol_be_global, find_cuda_device_allocatable_ultimate_component, find_cuda_device_context,
    get_cuda_data_attr, is_cuda_device_context, is_device_allocatable,
};
pub use derived::{
    finals_for_derived_type_instantiation, find_or_instantiate_derived_type, find_parent_type_spec,
    find_parent_type_spec_decl, find_parent_type_spec_scope, find_parent_type_spec_symbol, get_dtv_arg_derived_type,
    has_default_initialization, has_defined_io, has_destruction, has_impure_final, is_event_type_or_lock_type,
    is_finalizable, is_finalizable_symbol, is_or_contains_event_or_lock_component, may_have_defined_assignment,
    may_require_finalization, order_parameter_declarations, order_parameter_names,
};
pub use expr::{
    GetExprHelper, check_missing_analysis, get_assignment, get_expr, get_pointer_assignment, had_use_error,
    warn_on_deferred_length_character_scalar,
};
pub use image_control::{
    get_image_control_stmt_coarray_msg, get_image_control_stmt_location, has_coarray, is_image_control_stmt,
};
pub use labels::{LabelEnforce, check_construct, collect_labels};
pub use names::{
    BLANK_COMMON_OBJECT_NAME, get_all_names, get_common_block_object_name, get_module_or_submodule_name,
    is_defined_operator, make_op_name, maybe_get_node_name, to_array_spec,
};
pub use predicates::{
    can_be_type_bound_proc, find_common_block_containing, get_main_entry, has_alternate_returns,
    has_declaration_initializer, has_intrinsic_type_name, is_allocatable, is_allocatable_or_object_pointer,
    is_allocatable_or_pointer, is_assumed_length_character, is_assumed_rank, is_assumed_type, is_automatic,
    is_automatically_destroyed, is_bind_c_procedure, is_bind_c_procedure_scope, is_coarray,
    is_common_block_containing, is_destructible, is_dummy, is_elemental_procedure, is_function, is_function_result,
    is_function_scope, is_generic_defined_op, is_in_blank_common, is_in_stmt_function, is_initialized, is_intent_in,
    is_intent_inout, is_intent_out, is_named_constant, is_object_pointer, is_optional, is_pointer, is_pointer_dummy,
    is_polymorphic, is_polymorphic_allocatable, is_procedure, is_procedure_pointer, is_pure_procedure,
    is_pure_procedure_scope, is_saved, is_separate_module_procedure_interface, is_stmt_function,
    is_stmt_function_dummy, is_stmt_function_result, is_unlimited_polymorphic, is_variable,
};
pub use procedures::{
    OverriddenBinding, ProcedureDefinitionClass, classify_procedure, could_be_data_pointer_valued_function,
    find_function_result, find_global, find_interface, find_overridden_binding,
    find_separate_module_subprogram_interface, find_subprogram, is_external, is_function_result_with_same_name_as_function,
    is_module_procedure,
};
pub use scopes::{
    does_scope_contain, does_scope_contain_symbol, find_module_containing, find_module_file_containing,
    find_module_or_submodule_containing, find_openacc_construct_containing, find_pure_procedure_containing,
    find_scope_containing, get_program_unit_containing, get_program_unit_containing_symbol,
    get_program_unit_or_block_construct_containing, get_program_unit_or_block_construct_containing_symbol,
    get_top_level_unit_containing, get_top_level_unit_containing_symbol, is_module, is_submodule,
};
pub use storage::get_storage_associations;

/// Fixture helpers shared by the query tests
#[cfg(test)]
pub(crate) mod testing {
    use crate::loader::load_str;
    use crate::semantics::{LanguageFeatures, SemanticsContext};
    use crate::symbols::{ScopeId, SymbolId, SymbolTable};

    /// First symbol created with `name`
    pub fn symbol_named(table: &SymbolTable, name: &str) -> SymbolId {
        let wanted = table.lookup_name(name);
        table
            .symbol_ids()
            .find(|&id| Some(table.symbol(id).name) == wanted)
            .unwrap_or_else(|| panic!("no symbol named '{name}'"))
    }

    /// Scope defined by the first symbol named `name`
    pub fn scope_named(table: &SymbolTable, name: &str) -> ScopeId {
        table
            .symbol(symbol_named(table, name))
            .scope
            .unwrap_or_else(|| panic!("'{name}' does not define a scope"))
    }

    pub fn context_for(source: &str, features: LanguageFeatures) -> SemanticsContext {
        SemanticsContext::new(load_str(source).unwrap(), features)
    }
}
