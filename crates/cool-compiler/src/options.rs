//! Compiler configuration.

/// Knobs for a compilation run.
///
/// ```
/// use cool_compiler::CompilerOptions;
///
/// let options = CompilerOptions::new().trace_stages(true).annotate_asm(false);
/// assert!(options.trace_stages);
/// assert!(!options.annotate_asm);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Log an `info` event with the elapsed time of every stage.
    pub trace_stages: bool,
    /// Emit `#` comments naming sections, classes and methods in the assembly.
    pub annotate_asm: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            trace_stages: false,
            annotate_asm: true,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trace_stages(mut self, enabled: bool) -> Self {
        self.trace_stages = enabled;
        self
    }

    pub fn annotate_asm(mut self, enabled: bool) -> Self {
        self.annotate_asm = enabled;
        self
    }
}
