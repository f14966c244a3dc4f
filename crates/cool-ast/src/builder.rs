//! Arena-backed construction of AST nodes.
//!
//! The parser front end and the test suites both build trees through
//! [`AstBuilder`], which allocates every node in a caller-owned [`Bump`] and
//! stamps each one with a fresh [`NodeId`].

use std::cell::Cell;

use bumpalo::Bump;
use cool_core::{FileId, Span};

use crate::decl::{AttributeDecl, ClassDecl, Feature, Formal, MethodDecl, Program};
use crate::expr::{CaseBranch, Expr, ExprKind, LetBinding};
use crate::node::{Name, NodeId};
use crate::ops::{BinaryOp, UnaryOp};

pub struct AstBuilder<'ast> {
    arena: &'ast Bump,
    next_id: Cell<u32>,
}

impl<'ast> AstBuilder<'ast> {
    pub fn new(arena: &'ast Bump) -> Self {
        Self {
            arena,
            next_id: Cell::new(0),
        }
    }

    pub fn arena(&self) -> &'ast Bump {
        self.arena
    }

    /// Number of ids handed out so far.
    pub fn node_count(&self) -> u32 {
        self.next_id.get()
    }

    fn fresh_id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NodeId::new(id)
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    pub fn name(&self, text: &str, span: Span) -> Name<'ast> {
        Name::new(self.arena.alloc_str(text), span)
    }

    pub fn program(&self, classes: &[&'ast ClassDecl<'ast>]) -> Program<'ast> {
        Program {
            classes: self.arena.alloc_slice_copy(classes),
        }
    }

    pub fn class(
        &self,
        name: Name<'ast>,
        parent: Option<Name<'ast>>,
        features: &[Feature<'ast>],
        file: FileId,
    ) -> &'ast ClassDecl<'ast> {
        self.arena.alloc(ClassDecl {
            id: self.fresh_id(),
            name,
            parent,
            features: self.arena.alloc_slice_copy(features),
            file,
            span: name.span,
        })
    }

    pub fn attribute(
        &self,
        name: Name<'ast>,
        type_name: Name<'ast>,
        init: Option<&'ast Expr<'ast>>,
    ) -> Feature<'ast> {
        Feature::Attribute(self.arena.alloc(AttributeDecl {
            id: self.fresh_id(),
            name,
            type_name,
            init,
        }))
    }

    pub fn method(
        &self,
        name: Name<'ast>,
        formals: &[&'ast Formal<'ast>],
        return_type: Name<'ast>,
        body: &'ast Expr<'ast>,
    ) -> Feature<'ast> {
        Feature::Method(self.arena.alloc(MethodDecl {
            id: self.fresh_id(),
            name,
            formals: self.arena.alloc_slice_copy(formals),
            return_type,
            body,
        }))
    }

    pub fn formal(&self, name: Name<'ast>, type_name: Name<'ast>) -> &'ast Formal<'ast> {
        self.arena.alloc(Formal {
            id: self.fresh_id(),
            name,
            type_name,
        })
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    pub fn expr(&self, kind: ExprKind<'ast>, span: Span) -> &'ast Expr<'ast> {
        self.arena.alloc(Expr {
            id: self.fresh_id(),
            span,
            kind,
        })
    }

    pub fn int(&self, value: i32, span: Span) -> &'ast Expr<'ast> {
        self.expr(ExprKind::Int(value), span)
    }

    pub fn string(&self, value: &str, span: Span) -> &'ast Expr<'ast> {
        self.expr(ExprKind::Str(self.arena.alloc_str(value)), span)
    }

    pub fn boolean(&self, value: bool, span: Span) -> &'ast Expr<'ast> {
        self.expr(ExprKind::Bool(value), span)
    }

    pub fn ident(&self, name: Name<'ast>) -> &'ast Expr<'ast> {
        self.expr(ExprKind::Ident(name), name.span)
    }

    /// `span` is the operator's position.
    pub fn binary(
        &self,
        op: BinaryOp,
        lhs: &'ast Expr<'ast>,
        rhs: &'ast Expr<'ast>,
        span: Span,
    ) -> &'ast Expr<'ast> {
        self.expr(ExprKind::Binary { op, lhs, rhs }, span)
    }

    pub fn unary(&self, op: UnaryOp, operand: &'ast Expr<'ast>, span: Span) -> &'ast Expr<'ast> {
        self.expr(ExprKind::Unary { op, operand }, span)
    }

    pub fn assign(
        &self,
        target: Name<'ast>,
        value: &'ast Expr<'ast>,
        span: Span,
    ) -> &'ast Expr<'ast> {
        self.expr(ExprKind::Assign { target, value }, span)
    }

    pub fn new_object(&self, type_name: Name<'ast>, span: Span) -> &'ast Expr<'ast> {
        self.expr(ExprKind::New { type_name }, span)
    }

    pub fn dispatch(
        &self,
        receiver: &'ast Expr<'ast>,
        static_type: Option<Name<'ast>>,
        method: Name<'ast>,
        args: &[&'ast Expr<'ast>],
        span: Span,
    ) -> &'ast Expr<'ast> {
        self.expr(
            ExprKind::Dispatch {
                receiver,
                static_type,
                method,
                args: self.arena.alloc_slice_copy(args),
            },
            span,
        )
    }

    pub fn self_dispatch(
        &self,
        method: Name<'ast>,
        args: &[&'ast Expr<'ast>],
    ) -> &'ast Expr<'ast> {
        self.expr(
            ExprKind::SelfDispatch {
                method,
                args: self.arena.alloc_slice_copy(args),
            },
            method.span,
        )
    }

    pub fn conditional(
        &self,
        cond: &'ast Expr<'ast>,
        then_branch: &'ast Expr<'ast>,
        else_branch: &'ast Expr<'ast>,
        span: Span,
    ) -> &'ast Expr<'ast> {
        self.expr(
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span,
        )
    }

    pub fn while_loop(
        &self,
        cond: &'ast Expr<'ast>,
        body: &'ast Expr<'ast>,
        span: Span,
    ) -> &'ast Expr<'ast> {
        self.expr(ExprKind::While { cond, body }, span)
    }

    pub fn let_binding(
        &self,
        name: Name<'ast>,
        type_name: Name<'ast>,
        init: Option<&'ast Expr<'ast>>,
    ) -> &'ast LetBinding<'ast> {
        self.arena.alloc(LetBinding {
            id: self.fresh_id(),
            name,
            type_name,
            init,
        })
    }

    pub fn let_in(
        &self,
        bindings: &[&'ast LetBinding<'ast>],
        body: &'ast Expr<'ast>,
        span: Span,
    ) -> &'ast Expr<'ast> {
        self.expr(
            ExprKind::Let {
                bindings: self.arena.alloc_slice_copy(bindings),
                body,
            },
            span,
        )
    }

    pub fn case_branch(
        &self,
        name: Name<'ast>,
        type_name: Name<'ast>,
        body: &'ast Expr<'ast>,
    ) -> &'ast CaseBranch<'ast> {
        self.arena.alloc(CaseBranch {
            id: self.fresh_id(),
            name,
            type_name,
            body,
        })
    }

    pub fn case(
        &self,
        scrutinee: &'ast Expr<'ast>,
        branches: &[&'ast CaseBranch<'ast>],
        span: Span,
    ) -> &'ast Expr<'ast> {
        self.expr(
            ExprKind::Case {
                scrutinee,
                branches: self.arena.alloc_slice_copy(branches),
            },
            span,
        )
    }

    pub fn block(&self, exprs: &[&'ast Expr<'ast>], span: Span) -> &'ast Expr<'ast> {
        self.expr(ExprKind::Block(self.arena.alloc_slice_copy(exprs)), span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp(line: u32, col: u32) -> Span {
        Span::new(line, col)
    }

    #[test]
    fn ids_are_unique_and_sequential() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let one = b.int(1, sp(1, 1));
        let two = b.int(2, sp(1, 5));
        let sum = b.binary(BinaryOp::Add, one, two, sp(1, 3));
        assert_eq!(one.id, NodeId::new(0));
        assert_eq!(two.id, NodeId::new(1));
        assert_eq!(sum.id, NodeId::new(2));
        assert_eq!(b.node_count(), 3);
    }

    #[test]
    fn class_span_follows_name() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let class = b.class(b.name("Main", sp(3, 7)), None, &[], FileId::new(0));
        assert_eq!(class.span, sp(3, 7));
        assert!(class.parent.is_none());
        assert!(class.features.is_empty());
    }

    #[test]
    fn method_keeps_formal_order() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let x = b.formal(b.name("x", sp(1, 5)), b.name("Int", sp(1, 9)));
        let y = b.formal(b.name("y", sp(1, 14)), b.name("String", sp(1, 18)));
        let body = b.ident(b.name("x", sp(1, 30)));
        let Feature::Method(method) = b.method(b.name("f", sp(1, 3)), &[x, y], b.name("Int", sp(1, 26)), body)
        else {
            panic!("expected method");
        };
        let names: Vec<_> = method.formals.iter().map(|f| f.name.text).collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn self_dispatch_uses_method_position() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let call = b.self_dispatch(b.name("out_int", sp(4, 9)), &[b.int(3, sp(4, 17))]);
        assert_eq!(call.span, sp(4, 9));
        match &call.kind {
            ExprKind::SelfDispatch { method, args } => {
                assert!(method.is("out_int"));
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn string_literal_is_copied_into_arena() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let owned = String::from("hello\n");
        let lit = b.string(&owned, sp(1, 1));
        drop(owned);
        assert!(matches!(lit.kind, ExprKind::Str("hello\n")));
    }
}
