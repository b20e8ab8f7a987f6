//! Semantic analysis context

use crate::common::{Message, MessageText, Messages, Span};
use crate::evaluate::TypeCategory;
use crate::symbols::{SymbolFlags, SymbolId, SymbolTable};

/// Optional language extensions and warnings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LanguageFeatures {
    /// CUDA Fortran attributes and data placement rules
    pub cuda: bool,
    /// `.a.`, `.o.`, `.n.`, `.x.` as logical operators
    pub logical_abbreviations: bool,
    /// `.xor.` as a synonym of `.neqv.`
    pub xor_operator: bool,
    /// Warn about allocatable character scalars whose reallocation semantics
    /// changed in Fortran 202X
    pub warn_f202x_allocatable: bool,
}

/// Program-wide state shared by the queries that report messages
#[derive(Debug)]
pub struct SemanticsContext {
    table: SymbolTable,
    features: LanguageFeatures,
    messages: Messages,
}

impl SemanticsContext {
    pub fn new(table: SymbolTable, features: LanguageFeatures) -> Self {
        Self {
            table,
            features,
            messages: Messages::new(),
        }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut SymbolTable {
        &mut self.table
    }

    pub fn features(&self) -> LanguageFeatures {
        self.features
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn take_messages(&mut self) -> Vec<Message> {
        self.messages.take()
    }

    pub fn say(&mut self, at: Span, text: MessageText) -> &mut Message {
        self.messages.say(at, text)
    }

    pub fn any_fatal_error(&self) -> bool {
        self.messages.any_fatal_error()
    }

    /// Mark a symbol as erroneous so later checks skip it
    pub fn set_error(&mut self, symbol: SymbolId) {
        self.table.symbol_mut(symbol).set_flag(SymbolFlags::ERROR);
    }

    pub fn has_error(&self, symbol: SymbolId) -> bool {
        self.table.symbol(symbol).test(SymbolFlags::ERROR)
    }

    /// Default kind of an intrinsic type category
    pub fn default_kind(&self, category: TypeCategory) -> u8 {
        match category {
            TypeCategory::Character => 1,
            TypeCategory::Derived => 0,
            _ => 4,
        }
    }

    pub fn into_table(self) -> SymbolTable {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_kinds() {
        let context = SemanticsContext::new(SymbolTable::new(), LanguageFeatures::default());
        assert_eq!(context.default_kind(TypeCategory::Real), 4);
        assert_eq!(context.default_kind(TypeCategory::Character), 1);
        assert!(!context.any_fatal_error());
    }
}
