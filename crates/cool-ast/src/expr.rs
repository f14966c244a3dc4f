//! Expression nodes.

use cool_core::Span;

use crate::node::{Name, NodeId};
use crate::ops::{BinaryOp, UnaryOp};

/// An expression with its identity and position.
#[derive(Debug)]
pub struct Expr<'ast> {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind<'ast>,
}

/// The expression grammar.
#[derive(Debug)]
pub enum ExprKind<'ast> {
    /// Integer literal.
    Int(i32),
    /// String literal, escapes already decoded.
    Str(&'ast str),
    /// `true` / `false`.
    Bool(bool),
    /// Identifier reference, including `self`.
    Ident(Name<'ast>),
    /// `lhs op rhs`
    Binary {
        op: BinaryOp,
        lhs: &'ast Expr<'ast>,
        rhs: &'ast Expr<'ast>,
    },
    /// `op operand`
    Unary {
        op: UnaryOp,
        operand: &'ast Expr<'ast>,
    },
    /// `target <- value`
    Assign {
        target: Name<'ast>,
        value: &'ast Expr<'ast>,
    },
    /// `new Type`
    New { type_name: Name<'ast> },
    /// `receiver[@StaticType].method(args)`
    Dispatch {
        receiver: &'ast Expr<'ast>,
        static_type: Option<Name<'ast>>,
        method: Name<'ast>,
        args: &'ast [&'ast Expr<'ast>],
    },
    /// `method(args)` on the implicit receiver.
    SelfDispatch {
        method: Name<'ast>,
        args: &'ast [&'ast Expr<'ast>],
    },
    /// `if cond then a else b fi`
    If {
        cond: &'ast Expr<'ast>,
        then_branch: &'ast Expr<'ast>,
        else_branch: &'ast Expr<'ast>,
    },
    /// `while cond loop body pool`
    While {
        cond: &'ast Expr<'ast>,
        body: &'ast Expr<'ast>,
    },
    /// `let bindings in body`
    Let {
        bindings: &'ast [&'ast LetBinding<'ast>],
        body: &'ast Expr<'ast>,
    },
    /// `case scrutinee of branches esac`
    Case {
        scrutinee: &'ast Expr<'ast>,
        branches: &'ast [&'ast CaseBranch<'ast>],
    },
    /// `{ e1; e2; ... }`
    Block(&'ast [&'ast Expr<'ast>]),
}

/// One `name : Type [<- init]` of a `let`.
#[derive(Debug)]
pub struct LetBinding<'ast> {
    pub id: NodeId,
    pub name: Name<'ast>,
    pub type_name: Name<'ast>,
    pub init: Option<&'ast Expr<'ast>>,
}

/// One `name : Type => body;` of a `case`.
#[derive(Debug)]
pub struct CaseBranch<'ast> {
    pub id: NodeId,
    pub name: Name<'ast>,
    pub type_name: Name<'ast>,
    pub body: &'ast Expr<'ast>,
}
