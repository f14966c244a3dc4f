//! Core types shared by every crate of the COOL compiler backend.
//!
//! - [`Span`]: line/column positions on AST nodes
//! - [`SourceMap`], [`FileId`], [`Location`]: which file a node came from
//! - [`SemanticError`]: the error taxonomy
//! - [`Diagnostics`]: the ordered diagnostics channel

mod diagnostics;
mod error;
mod source;
mod span;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{ErrorCategory, SemanticError};
pub use source::{FileId, Location, SourceMap};
pub use span::Span;

/// Name of the universal root class.
pub const OBJECT: &str = "Object";
/// Name of the I/O class.
pub const IO: &str = "IO";
/// Name of the integer class.
pub const INT: &str = "Int";
/// Name of the string class.
pub const STRING: &str = "String";
/// Name of the boolean class.
pub const BOOL: &str = "Bool";
/// The self-type pseudo-type.
pub const SELF_TYPE: &str = "SELF_TYPE";
/// The receiver identifier.
pub const SELF: &str = "self";
/// Class that must hold the program entry point.
pub const MAIN_CLASS: &str = "Main";
/// Entry method name.
pub const MAIN_METHOD: &str = "main";
