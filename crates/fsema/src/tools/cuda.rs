//! CUDA data placement policy

use crate::semantics::SemanticsContext;
use crate::symbols::{CudaDataAttr, CudaSubprogramAttrs, DerivedTypeId, ScopeId, ScopeKind, SymbolId, SymbolTable};

use super::association::get_association_root;
use super::components::{ComponentMatch, UltimateComponentIterator};
use super::predicates::is_allocatable;
use super::scopes::find_scope_containing;

/// Scope of a subprogram whose code runs on the device
pub fn is_cuda_device_context(table: &SymbolTable, scope: Option<ScopeId>) -> bool {
    scope
        .and_then(|scope| table.scope(scope).symbol)
        .and_then(|symbol| table.ultimate_symbol(symbol).details.as_subprogram())
        .and_then(|subprogram| subprogram.cuda_attrs)
        .is_some_and(|attrs| attrs != CudaSubprogramAttrs::Host)
}

pub fn find_cuda_device_context(table: &SymbolTable, scope: Option<ScopeId>) -> Option<ScopeId> {
    find_scope_containing(table, scope?, |candidate| is_cuda_device_context(table, Some(candidate)))
}

/// Allocatable with a device-resident data attribute
pub fn is_device_allocatable(table: &SymbolTable, symbol: SymbolId) -> bool {
    is_allocatable(table, symbol)
        && table
            .ultimate_symbol(symbol)
            .details
            .as_object()
            .and_then(|object| object.cuda_data_attr)
            .is_some_and(|attr| attr != CudaDataAttr::Pinned)
}

pub fn find_cuda_device_allocatable_ultimate_component(
    table: &SymbolTable,
    derived: DerivedTypeId,
) -> Option<ComponentMatch> {
    UltimateComponentIterator::new(table, derived).find(|component| is_device_allocatable(table, component))
}

/// Whether a main program variable may live in host global storage
pub fn can_cuda_symbol_be_global(context: &SemanticsContext, symbol: SymbolId) -> bool {
    let table = context.table();
    let root = get_association_root(table, symbol, false);
    if !context.features().cuda || table.scope(table.symbol(root).owner).kind != ScopeKind::MainProgram {
        return true;
    }
    let Some(object) = table.ultimate_symbol(symbol).details.as_object() else {
        return true;
    };
    if let Some(derived) = object.ty.as_ref().and_then(|ty| ty.as_derived())
        && find_cuda_device_allocatable_ultimate_component(table, derived).is_some()
    {
        return false;
    }
    object.cuda_data_attr.is_none_or(|attr| attr == CudaDataAttr::Unified)
}

/// Effective data attribute of an object; one with a device-resident
/// allocatable component is managed whatever it declares
pub fn get_cuda_data_attr(table: &SymbolTable, symbol: Option<SymbolId>) -> Option<CudaDataAttr> {
    let object = table.symbol(symbol?).details.as_object()?;
    if let Some(derived) = object.ty.as_ref().and_then(|ty| ty.as_derived())
        && find_cuda_device_allocatable_ultimate_component(table, derived).is_some()
    {
        return Some(CudaDataAttr::Managed);
    }
    object.cuda_data_attr
}
