//! Symbol table model
//!
//! Scopes, symbols and derived-type instantiations live in a single arena,
//! [`SymbolTable`], and refer to each other through copyable ids. Type graphs
//! may be cyclic (a type can hold a pointer to itself); ids make that
//! representable without cyclic ownership.

mod attrs;
mod details;
mod ids;
mod scope;
mod symbol;
mod table;
mod types;

pub use attrs::{Attrs, SymbolFlags};
pub use details::{
    AssocEntityDetails, CommonBlockDetails, CudaDataAttr, CudaSubprogramAttrs, DefinedIo,
    Details, DerivedTypeDetails, GenericDetails, GenericKind, HostAssocDetails, MiscDetails,
    MiscKind, ModuleDetails, ObjectDetails, ProcBindingDetails, ProcEntityDetails,
    SubprogramDetails, SubprogramKind, SubprogramNameDetails, TypeParamAttr, TypeParamDetails,
    UseDetails, UseErrorDetails,
};
pub use ids::{DerivedTypeId, Name, ScopeId, SymbolId};
pub use scope::{EquivalenceObject, EquivalenceSet, Scope, ScopeKind};
pub use symbol::Symbol;
pub use table::SymbolTable;
pub use types::{ArraySpec, DeclTypeSpec, DerivedCategory, DerivedTypeSpec, ParamValue};
