//! The diagnostics channel shared by all passes.
//!
//! Diagnostics are appended in the order the passes find them. A single
//! [`Diagnostics::has_errors`] flag gates whether code generation runs.

use std::fmt;
use std::io;

use crate::{Location, SemanticError};

/// One reported semantic error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// What went wrong.
    pub error: SemanticError,
    /// Where it went wrong; absent for whole-program errors.
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn new(error: SemanticError, location: Option<Location>) -> Self {
        Self { error, location }
    }

    /// The bare message, without position prefix.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}, Semantic error: {}", self.error),
            None => write!(f, "Semantic error: {}", self.error),
        }
    }
}

/// Ordered collection of diagnostics for one compilation run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an error at a source location.
    pub fn report(&mut self, location: Location, error: SemanticError) {
        self.items.push(Diagnostic::new(error, Some(location)));
    }

    /// Report an error that has no single source position.
    pub fn report_global(&mut self, error: SemanticError) {
        self.items.push(Diagnostic::new(error, None));
    }

    pub fn has_errors(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Bare messages in report order.
    pub fn messages(&self) -> Vec<String> {
        self.items.iter().map(Diagnostic::message).collect()
    }

    /// Move every diagnostic of `other` to the end of this collection.
    pub fn append(&mut self, other: &mut Diagnostics) {
        self.items.append(&mut other.items);
    }

    /// Write one line per diagnostic.
    pub fn write_to(&self, out: &mut impl io::Write) -> io::Result<()> {
        for diagnostic in &self.items {
            writeln!(out, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.items {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    fn location() -> Location {
        Location {
            file_name: "main.cl".into(),
            span: Span::new(2, 5),
        }
    }

    #[test]
    fn located_diagnostic_format() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(
            location(),
            SemanticError::UndefinedIdentifier { name: "x".into() },
        );

        let line = diagnostics.iter().next().unwrap().to_string();
        assert_eq!(
            line,
            "\"main.cl\", line 2:5, Semantic error: Undefined identifier x"
        );
    }

    #[test]
    fn global_diagnostic_format() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report_global(SemanticError::MissingEntryPoint);
        assert_eq!(
            diagnostics.to_string(),
            "Semantic error: No method main in class Main\n"
        );
    }

    #[test]
    fn has_errors_tracks_reports() {
        let mut diagnostics = Diagnostics::new();
        assert!(!diagnostics.has_errors());
        diagnostics.report_global(SemanticError::AssignToSelf);
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn write_to_emits_lines() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(location(), SemanticError::AssignToSelf);
        diagnostics.report_global(SemanticError::MissingEntryPoint);

        let mut out = Vec::new();
        diagnostics.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
