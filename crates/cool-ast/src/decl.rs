//! Declaration nodes: program, classes, features, formals.

use cool_core::{FileId, Span};

use crate::expr::Expr;
use crate::node::{Name, NodeId};

/// A whole program: every class of every input file, in source order.
#[derive(Debug, Clone, Copy)]
pub struct Program<'ast> {
    pub classes: &'ast [&'ast ClassDecl<'ast>],
}

impl<'ast> Program<'ast> {
    pub fn classes(&self) -> impl Iterator<Item = &'ast ClassDecl<'ast>> + '_ {
        self.classes.iter().copied()
    }
}

/// `class Name [inherits Parent] { features };`
#[derive(Debug)]
pub struct ClassDecl<'ast> {
    pub id: NodeId,
    pub name: Name<'ast>,
    pub parent: Option<Name<'ast>>,
    pub features: &'ast [Feature<'ast>],
    /// File the class was declared in.
    pub file: FileId,
    pub span: Span,
}

/// A class member.
#[derive(Debug, Clone, Copy)]
pub enum Feature<'ast> {
    Attribute(&'ast AttributeDecl<'ast>),
    Method(&'ast MethodDecl<'ast>),
}

/// `name : Type [<- init]`
#[derive(Debug)]
pub struct AttributeDecl<'ast> {
    pub id: NodeId,
    pub name: Name<'ast>,
    pub type_name: Name<'ast>,
    pub init: Option<&'ast Expr<'ast>>,
}

/// `name(formals) : ReturnType { body }`
#[derive(Debug)]
pub struct MethodDecl<'ast> {
    pub id: NodeId,
    pub name: Name<'ast>,
    pub formals: &'ast [&'ast Formal<'ast>],
    pub return_type: Name<'ast>,
    pub body: &'ast Expr<'ast>,
}

/// `name : Type` in a method signature.
#[derive(Debug)]
pub struct Formal<'ast> {
    pub id: NodeId,
    pub name: Name<'ast>,
    pub type_name: Name<'ast>,
}
