//! Semantic passes.
//!
//! - [`definition`]: Pass 1 - declare every symbol, link parents, stamp scopes
//! - [`resolution`]: Pass 2 - resolve type names, type-check, validate overrides
//! - [`layout`]: Pass 3 - class tags, attribute offsets, dispatch slots, frame offsets
//!
//! Code generation lives in [`crate::codegen`].

pub mod definition;
pub mod layout;
pub mod resolution;

pub use definition::{DefinitionOutput, DefinitionPass};
pub use layout::{LayoutOutput, LayoutPass};
pub use resolution::{ResolutionOutput, ResolutionPass};

use cool_core::{Diagnostics, FileId, SemanticError, SourceMap, Span};
use tracing::trace;

/// Turns spans into located diagnostics for the file currently being walked.
pub(crate) struct Reporter<'a> {
    sources: &'a SourceMap,
    file: FileId,
    diagnostics: Diagnostics,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sources: &'a SourceMap) -> Self {
        Self {
            sources,
            file: FileId::new(0),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Attribute subsequent errors to `file`.
    pub(crate) fn enter_file(&mut self, file: FileId) {
        self.file = file;
    }

    pub(crate) fn error(&mut self, span: Span, error: SemanticError) {
        let location = self.sources.locate(self.file, span);
        trace!(target: "cool::diagnostics", %location, %error, "semantic error");
        self.diagnostics.report(location, error);
    }

    pub(crate) fn global(&mut self, error: SemanticError) {
        trace!(target: "cool::diagnostics", %error, "semantic error");
        self.diagnostics.report_global(error);
    }

    pub(crate) fn finish(self) -> Diagnostics {
        self.diagnostics
    }
}
