//! Lexical scopes.
//!
//! Every declaring construct opens a scope with exactly one parent:
//! class → global, method → its class, let/case binding → enclosing scope.
//! Class scopes delegate to the parent *class* on a miss, so inherited
//! attributes are visible.

use crate::ids::{ClassId, IdentId, MethodId, ScopeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Class(ClassId),
    Method(MethodId),
    /// A single let or case-branch variable.
    Binding(IdentId),
}

#[derive(Debug, Clone, Copy)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
}

impl Scope {
    pub fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self { kind, parent }
    }
}
