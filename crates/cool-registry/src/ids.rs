//! Stable handles into the [`SymbolRegistry`](crate::SymbolRegistry) arenas.
//!
//! Symbols reference each other through these indices rather than by
//! pointer, so a class can be linked to a parent that is declared later.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Index of a class symbol.
    ClassId,
    "class"
);
define_id!(
    /// Index of a method symbol.
    MethodId,
    "method"
);
define_id!(
    /// Index of an identifier symbol (attribute, formal, let or case variable).
    IdentId,
    "ident"
);
define_id!(
    /// Index of a lookup scope.
    ScopeId,
    "scope"
);

impl ClassId {
    pub const OBJECT: ClassId = ClassId(0);
    pub const IO: ClassId = ClassId(1);
    pub const INT: ClassId = ClassId(2);
    pub const STRING: ClassId = ClassId(3);
    pub const BOOL: ClassId = ClassId(4);
    /// The self-type pseudo-class. Registered so type names resolve, never tagged.
    pub const SELF_TYPE: ClassId = ClassId(5);

    /// Int, String or Bool.
    pub fn is_value_type(self) -> bool {
        matches!(self, ClassId::INT | ClassId::STRING | ClassId::BOOL)
    }
}

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}
