//! Pipeline-level errors.

use std::fmt;

use cool_core::Diagnostics;
use thiserror::Error;

/// Why [`Compiler::compile`](crate::Compiler::compile) produced no assembly.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The program has semantic errors; code generation was not attempted.
    #[error("{} semantic error(s)", .0.len())]
    Semantic(Diagnostics),

    /// Writing the assembly text failed.
    #[error("failed to write assembly: {0}")]
    Emit(#[from] fmt::Error),

    /// A pass found the symbol graph in a state earlier passes should have ruled out.
    #[error("internal compiler error: {message}")]
    Internal { message: String },
}

impl CompileError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal {
            message: message.into(),
        }
    }

    /// Diagnostics of a failed semantic check, if that is what failed.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            CompileError::Semantic(diagnostics) => Some(diagnostics),
            _ => None,
        }
    }
}
