//! Declared attributes and analysis flags

use bitflags::bitflags;

bitflags! {
    /// Attributes declared on an entity
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attrs: u32 {
        const ABSTRACT = 1 << 0;
        const ALLOCATABLE = 1 << 1;
        const ASYNCHRONOUS = 1 << 2;
        const BIND_C = 1 << 3;
        const CONTIGUOUS = 1 << 4;
        const DEFERRED = 1 << 5;
        const ELEMENTAL = 1 << 6;
        const EXTENDS = 1 << 7;
        const EXTERNAL = 1 << 8;
        const IMPURE = 1 << 9;
        const INTENT_IN = 1 << 10;
        const INTENT_INOUT = 1 << 11;
        const INTENT_OUT = 1 << 12;
        const INTRINSIC = 1 << 13;
        const MODULE = 1 << 14;
        const NON_OVERRIDABLE = 1 << 15;
        const NOPASS = 1 << 16;
        const OPTIONAL = 1 << 17;
        const PARAMETER = 1 << 18;
        const PASS = 1 << 19;
        const POINTER = 1 << 20;
        const PRIVATE = 1 << 21;
        const PROTECTED = 1 << 22;
        const PUBLIC = 1 << 23;
        const PURE = 1 << 24;
        const RECURSIVE = 1 << 25;
        const SAVE = 1 << 26;
        const TARGET = 1 << 27;
        const VALUE = 1 << 28;
        const VOLATILE = 1 << 29;
    }
}

impl Attrs {
    /// Look up an attribute by its spelling in declarations
    pub fn from_keyword(keyword: &str) -> Option<Attrs> {
        let attr = match keyword {
            "abstract" => Attrs::ABSTRACT,
            "allocatable" => Attrs::ALLOCATABLE,
            "asynchronous" => Attrs::ASYNCHRONOUS,
            "contiguous" => Attrs::CONTIGUOUS,
            "deferred" => Attrs::DEFERRED,
            "elemental" => Attrs::ELEMENTAL,
            "external" => Attrs::EXTERNAL,
            "impure" => Attrs::IMPURE,
            "intrinsic" => Attrs::INTRINSIC,
            "module" => Attrs::MODULE,
            "non_overridable" => Attrs::NON_OVERRIDABLE,
            "nopass" => Attrs::NOPASS,
            "optional" => Attrs::OPTIONAL,
            "parameter" => Attrs::PARAMETER,
            "pass" => Attrs::PASS,
            "pointer" => Attrs::POINTER,
            "private" => Attrs::PRIVATE,
            "protected" => Attrs::PROTECTED,
            "public" => Attrs::PUBLIC,
            "pure" => Attrs::PURE,
            "recursive" => Attrs::RECURSIVE,
            "save" => Attrs::SAVE,
            "target" => Attrs::TARGET,
            "value" => Attrs::VALUE,
            "volatile" => Attrs::VOLATILE,
            _ => return None,
        };
        Some(attr)
    }
}

bitflags! {
    /// Facts recorded about a symbol by resolution and later passes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SymbolFlags: u16 {
        /// An error has already been reported for this symbol
        const ERROR = 1 << 0;
        const FUNCTION = 1 << 1;
        const SUBROUTINE = 1 << 2;
        /// The component that holds the parent type of an extended type
        const PARENT_COMP = 1 << 3;
        /// Initialized by a DATA statement
        const IN_DATA_STMT = 1 << 4;
        const IMPLICIT = 1 << 5;
        const CRAY_POINTER = 1 << 6;
        const CRAY_POINTEE = 1 << 7;
    }
}
