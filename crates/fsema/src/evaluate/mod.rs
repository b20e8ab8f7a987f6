//! Typed expressions and dynamic types
//!
//! The subset of expression analysis the semantic queries need: the
//! category/kind view of a type, "same derived type" identity, and typed
//! expressions attached to parse-tree nodes.

mod expr;
mod ops;
mod types;

pub use expr::{Assignment, AssignmentKind, DataRef, Expr};
pub use ops::{LogicalOperator, RelationalOperator, Tristate};
pub use types::{DynamicType, TypeCategory, are_conformable, are_same_derived_type, extends};
pub(crate) use types::parent_type_spec;
