//! fsema - semantic query layer for a Fortran-like compiler
//!
//! This library answers the questions the semantic checks of a compiler ask
//! about a resolved program: what a name refers to, how a procedure is
//! defined, which components a derived type has, whether an object needs
//! finalization, and where control flow may legally go.
//!
//! ## Architecture
//!
//! The library is organized into:
//! - **Symbols** (`symbols/`): Scope tree, symbols, details and type specs
//! - **Evaluate** (`evaluate/`): Dynamic types and analyzed expressions
//! - **Parse tree** (`parse_tree/`): Statement nodes the queries inspect
//! - **Semantics** (`semantics/`): Context with language features and messages
//! - **Tools** (`tools/`): The semantic queries
//! - **Loader** (`loader/`): Program description language for building tables
//! - **Driver** (`driver/`): Reports over a loaded description
//! - **Common** (`common/`): Shared infrastructure (errors, spans, messages)

pub mod common;
pub mod driver;
pub mod evaluate;
pub mod loader;
pub mod parse_tree;
pub mod semantics;
pub mod symbols;
pub mod tools;

// Re-exports for convenience
pub use common::{DiagnosticReporter, Message, MessageText, Messages, SemaError, SemaResult, Severity, Span};
pub use driver::{Analysis, Driver, DriverConfig, Report};
pub use semantics::{LanguageFeatures, SemanticsContext};
pub use symbols::{Scope, ScopeId, ScopeKind, Symbol, SymbolId, SymbolTable};
