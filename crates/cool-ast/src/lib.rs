//! COOL abstract syntax tree.
//!
//! Nodes live in a [`bumpalo::Bump`] arena and reference each other through
//! `&'ast` borrows. Every declaration and expression carries a [`NodeId`] so
//! the semantic passes can attach scopes and symbols without mutating the
//! tree.
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use cool_ast::{AstBuilder, BinaryOp};
//! use cool_core::{FileId, Span};
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let at = |col| Span::new(1, col);
//!
//! let body = b.binary(BinaryOp::Add, b.int(1, at(20)), b.int(2, at(24)), at(22));
//! let main = b.method(b.name("main", at(12)), &[], b.name("Int", at(16)), body);
//! let class = b.class(b.name("Main", at(7)), None, &[main], FileId::new(0));
//! let program = b.program(&[class]);
//!
//! assert_eq!(program.classes.len(), 1);
//! ```

pub mod builder;
pub mod decl;
pub mod expr;
pub mod node;
pub mod ops;

pub use builder::AstBuilder;
pub use decl::*;
pub use expr::*;
pub use node::*;
pub use ops::*;
