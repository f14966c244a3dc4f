//! Node identity and names.

use cool_core::Span;

/// Identity of an AST node, unique within one [`AstBuilder`](crate::AstBuilder).
///
/// Passes key their side tables (scopes, symbols, resolved callees) by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A lexeme with its position: class names, type names, identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Name<'ast> {
    pub text: &'ast str,
    pub span: Span,
}

impl<'ast> Name<'ast> {
    pub fn new(text: &'ast str, span: Span) -> Self {
        Self { text, span }
    }

    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }
}
