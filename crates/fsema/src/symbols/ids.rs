//! Arena handles

/// Interned, lower-case identifier
pub type Name = string_interner::DefaultSymbol;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index as u32)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(
    /// Handle of a [`Scope`](super::Scope)
    ScopeId
);
arena_id!(
    /// Handle of a [`Symbol`](super::Symbol)
    SymbolId
);
arena_id!(
    /// Handle of a [`DerivedTypeSpec`](super::DerivedTypeSpec)
    DerivedTypeId
);
