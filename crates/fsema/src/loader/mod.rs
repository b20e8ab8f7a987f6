//! Program description loader
//!
//! Reads the brace-delimited declaration language used to describe
//! programs, and resolves it into a [`SymbolTable`]:
//!
//! ```text
//! module shapes {
//!   type, abstract :: shape { procedure(area_if), deferred :: area }
//!   abstract interface { real function area_if(s) { class(shape) :: s } }
//! }
//! ```
//!
//! Only declarations are described; executable statements have no syntax.

mod ast;
mod parser;
mod resolver;
mod scanner;
mod token;

use std::fs;
use std::path::Path;

pub use token::{Token, TokenKind};

use crate::common::SemaResult;
use crate::symbols::SymbolTable;

/// Parse and resolve a program description
pub fn load_str(source: &str) -> SemaResult<SymbolTable> {
    let file = parser::parse(source)?;
    tracing::debug!(units = file.units.len(), "parsed program description");
    resolver::Resolver::new().resolve(&file)
}

pub fn load_file(path: &Path) -> SemaResult<SymbolTable> {
    let source = fs::read_to_string(path)?;
    load_str(&source)
}

/// Every token of `source`, ending with [`TokenKind::Eof`]
pub fn tokenize(source: &str) -> SemaResult<Vec<Token>> {
    scanner::Lexer::new(source).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_reports_first_error() {
        let err = load_str("program p { integer :: }").unwrap_err();
        assert!(err.span().is_some());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_file(Path::new("/nonexistent/description.fsd")).unwrap_err();
        assert!(matches!(err, crate::common::SemaError::Io(_)));
    }

    #[test]
    fn test_tokenize_ends_with_eof() {
        let tokens = tokenize("module m { }").unwrap();
        assert_eq!(tokens.last().map(|token| &token.kind), Some(&TokenKind::Eof));
        assert_eq!(tokens.len(), 5);
    }
}
