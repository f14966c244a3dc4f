//! Symbol & scope model for the COOL compiler.
//!
//! [`SymbolRegistry`] owns every class, method and identifier symbol plus
//! the scope chain used to resolve identifiers. It is created holding the
//! predefined classes `Object`, `IO`, `Int`, `String` and `Bool` (tags 0-4)
//! and the `SELF_TYPE` pseudo-class, then filled in by the compiler passes.

mod hierarchy;
mod ids;
mod registry;
mod scope;
mod symbols;

pub use hierarchy::Ancestors;
pub use ids::{ClassId, IdentId, MethodId, ScopeId};
pub use registry::{LAST_BUILTIN_TAG, SymbolRegistry};
pub use scope::{Scope, ScopeKind};
pub use symbols::{
    ClassOrigin, ClassSymbol, FxIndexMap, IdentKind, IdentSymbol, MethodSymbol,
};
