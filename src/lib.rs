//! COOL compiler backend.
//!
//! Takes a parsed program, checks it, and produces MIPS assembly for the
//! standard COOL runtime.
//!
//! ```
//! use coolc::prelude::*;
//!
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let mut sources = SourceMap::new();
//! let file = sources.add("hello.cl");
//!
//! // class Main { main(): Int { 42 }; };
//! let main = b.method(
//!     b.name("main", Span::new(1, 14)),
//!     &[],
//!     b.name("Int", Span::new(1, 22)),
//!     b.int(42, Span::new(1, 28)),
//! );
//! let class = b.class(b.name("Main", Span::new(1, 7)), None, &[main], file);
//! let program = b.program(&[class]);
//!
//! let compiled = Compiler::default().compile(&program, &sources).unwrap();
//! assert!(compiled.assembly.contains("Main.main:"));
//! ```

pub use cool_ast as ast;
pub use cool_compiler as compiler;
pub use cool_core as core;
pub use cool_registry as registry;

pub use bumpalo::Bump;
pub use cool_compiler::{Analysis, CompileError, CompiledProgram, Compiler, CompilerOptions};
pub use cool_core::{Diagnostic, Diagnostics, SemanticError, SourceMap, Span};

// Re-export main types
pub mod prelude {
    pub use bumpalo::Bump;
    pub use cool_ast::{AstBuilder, BinaryOp, Program, UnaryOp};
    pub use cool_compiler::{CompileError, CompiledProgram, Compiler, CompilerOptions};
    pub use cool_core::{Diagnostics, FileId, SemanticError, SourceMap, Span};
}
