//! Source file bookkeeping.
//!
//! Several input files may be merged into one program; every class declaration
//! remembers the [`FileId`] it came from so diagnostics and runtime abort
//! paths can name the originating file.

use std::fmt;
use std::path::Path;

use crate::Span;

/// Identifies one input file of a compilation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileId(u32);

impl FileId {
    /// Create a file id from its index in the [`SourceMap`].
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Index into the [`SourceMap`].
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The set of files merged into one program.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<String>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file path and return its id.
    pub fn add(&mut self, path: impl Into<String>) -> FileId {
        let id = FileId::new(self.files.len() as u32);
        self.files.push(path.into());
        id
    }

    /// Full path as registered.
    pub fn path(&self, file: FileId) -> Option<&str> {
        self.files.get(file.index()).map(String::as_str)
    }

    /// Final path component, which is what diagnostics and runtime errors show.
    pub fn file_name(&self, file: FileId) -> &str {
        self.path(file)
            .map(|path| {
                Path::new(path)
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or(path)
            })
            .unwrap_or("<unknown>")
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Build a [`Location`] for a span inside `file`.
    pub fn locate(&self, file: FileId, span: Span) -> Location {
        Location {
            file_name: self.file_name(file).to_string(),
            span,
        }
    }
}

/// A resolved position: file name plus line and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file_name: String,
    pub span: Span,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\", {}", self.file_name, self.span)
    }
}
