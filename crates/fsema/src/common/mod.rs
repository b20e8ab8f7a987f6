//! Common infrastructure shared by the symbol table, the queries and the loader

mod error;
mod fatal;
mod message;
mod span;

pub use error::{DiagnosticReporter, SemaError, SemaResult};
pub use fatal::{deref, die};
pub use message::{Message, MessageText, Messages, Severity};
pub use span::Span;
