//! Symbols

use crate::common::Span;

use super::{Attrs, Details, Name, ScopeId, SymbolFlags};

/// A named entity owned by exactly one scope
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: Name,
    pub owner: ScopeId,
    pub attrs: Attrs,
    pub flags: SymbolFlags,
    pub details: Details,
    /// Scope defined by this symbol (module, subprogram, derived type, ...)
    pub scope: Option<ScopeId>,
    /// Byte offset within its storage sequence
    pub offset: usize,
    pub size: usize,
    /// Binding label from BIND(C, NAME=...)
    pub bind_name: Option<String>,
    pub span: Span,
}

impl Symbol {
    pub fn new(name: Name, owner: ScopeId, attrs: Attrs, details: Details, span: Span) -> Self {
        Self {
            name,
            owner,
            attrs,
            flags: SymbolFlags::empty(),
            details,
            scope: None,
            offset: 0,
            size: 0,
            bind_name: None,
            span,
        }
    }

    pub fn has(&self, attr: Attrs) -> bool {
        self.attrs.contains(attr)
    }

    pub fn has_any(&self, attrs: Attrs) -> bool {
        self.attrs.intersects(attrs)
    }

    pub fn test(&self, flag: SymbolFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn set_flag(&mut self, flag: SymbolFlags) {
        self.flags.insert(flag);
    }

    pub fn is_subprogram(&self) -> bool {
        matches!(self.details, Details::Subprogram(_) | Details::SubprogramName(_))
    }

    /// Any kind of dummy argument
    pub fn is_dummy(&self) -> bool {
        match &self.details {
            Details::Object(object) => object.is_dummy,
            Details::ProcEntity(proc) => proc.is_dummy,
            _ => false,
        }
    }

    pub fn is_func_result(&self) -> bool {
        match &self.details {
            Details::Object(object) => object.is_func_result,
            Details::ProcEntity(proc) => proc.is_func_result,
            _ => false,
        }
    }

    /// Has a binding label, explicit or implied by BIND(C)
    pub fn has_bind_name(&self) -> bool {
        self.bind_name.is_some()
    }

    pub fn corank(&self) -> usize {
        self.details.as_object().map_or(0, |object| object.corank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{ObjectDetails, SymbolTable};

    #[test]
    fn test_flags_and_attrs() {
        let mut table = SymbolTable::new();
        let name = table.intern("x");
        let mut symbol = Symbol::new(
            name,
            table.global(),
            Attrs::POINTER | Attrs::TARGET,
            Details::Object(ObjectDetails::default().dummy()),
            Span::default(),
        );
        assert!(symbol.has(Attrs::POINTER));
        assert!(symbol.has_any(Attrs::ALLOCATABLE | Attrs::TARGET));
        assert!(!symbol.test(SymbolFlags::IN_DATA_STMT));
        symbol.set_flag(SymbolFlags::IN_DATA_STMT);
        assert!(symbol.test(SymbolFlags::IN_DATA_STMT));
        assert!(symbol.is_dummy());
    }
}
