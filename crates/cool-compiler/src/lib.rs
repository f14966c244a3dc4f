//! COOL Compiler
//!
//! Semantic analysis and MIPS code generation for a parsed COOL program.
//!
//! ## Architecture
//!
//! - **Pass 1 (Definition)**: declare classes, features and scopes; patch parent links
//! - **Pass 2 (Resolution)**: type check every expression, validate overrides and the entry point
//! - **Pass 3 (Layout)**: assign class tags, attribute offsets, dispatch slots and frame offsets
//! - **Pass 4 (Code Generation)**: emit the data and text sections
//!
//! Passes 1 and 2 collect diagnostics instead of stopping at the first error.
//! Layout and code generation only run when no diagnostic was reported.
//!
//! ## Modules
//!
//! - [`annotations`]: per-node side tables shared by the passes
//! - [`codegen`]: code generator and constant pools
//! - [`emit`]: assembly text emitter and label generator
//! - [`passes`]: definition, resolution and layout passes

pub mod annotations;
pub mod codegen;
pub mod emit;
mod error;
mod options;
pub mod passes;

use std::time::Instant;

use cool_ast::Program;
use cool_core::{Diagnostics, SourceMap};
use cool_registry::SymbolRegistry;
use tracing::info;

pub use annotations::Annotations;
pub use codegen::{CodeGenerator, CodegenOutput, ConstantPool};
pub use error::CompileError;
pub use options::CompilerOptions;
pub use passes::{
    DefinitionOutput, DefinitionPass, LayoutOutput, LayoutPass, ResolutionOutput, ResolutionPass,
};

/// A semantically valid program with its layout computed.
#[derive(Debug)]
pub struct Analysis {
    pub registry: SymbolRegistry,
    pub annotations: Annotations,
    pub layout: LayoutOutput,
}

/// Result of a successful compilation.
#[derive(Debug)]
pub struct CompiledProgram {
    /// Assembly text: data section followed by text section.
    pub assembly: String,
    /// Number of classes, built-in ones included.
    pub classes: usize,
    /// Number of user method bodies emitted.
    pub methods: usize,
    pub int_constants: usize,
    pub string_constants: usize,
    pub instructions: usize,
}

/// The main compiler entry point.
///
/// Each call to [`compile`](Self::compile) starts from a fresh symbol
/// registry; nothing carries over between runs.
#[derive(Debug, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile a whole program to assembly.
    ///
    /// Returns [`CompileError::Semantic`] with every collected diagnostic if
    /// the program is not valid; no assembly is produced in that case.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(
        &self,
        program: &Program<'_>,
        sources: &SourceMap,
    ) -> Result<CompiledProgram, CompileError> {
        let analysis = self.analyze(program, sources)?;

        let start = Instant::now();
        let output = CodeGenerator::new(
            &analysis.registry,
            &analysis.annotations,
            sources,
            &self.options,
        )
        .run(program)?;
        self.trace_stage("codegen", start);

        Ok(CompiledProgram {
            assembly: output.assembly,
            classes: analysis.registry.class_count(),
            methods: output.methods_emitted,
            int_constants: output.int_constants,
            string_constants: output.string_constants,
            instructions: output.instructions,
        })
    }

    /// Run the definition, resolution and layout passes.
    pub fn analyze(
        &self,
        program: &Program<'_>,
        sources: &SourceMap,
    ) -> Result<Analysis, CompileError> {
        let mut registry = SymbolRegistry::new();
        let mut annotations = Annotations::new();
        let mut diagnostics = Diagnostics::new();

        let start = Instant::now();
        let mut definition =
            DefinitionPass::new(&mut registry, &mut annotations, sources).run(program);
        diagnostics.append(&mut definition.diagnostics);
        self.trace_stage("definition", start);

        let start = Instant::now();
        let mut resolution =
            ResolutionPass::new(&mut registry, &mut annotations, sources).run(program);
        diagnostics.append(&mut resolution.diagnostics);
        self.trace_stage("resolution", start);

        if diagnostics.has_errors() {
            return Err(CompileError::Semantic(diagnostics));
        }

        let start = Instant::now();
        let layout = LayoutPass::new(&mut registry, &mut annotations).run(program);
        self.trace_stage("layout", start);

        Ok(Analysis {
            registry,
            annotations,
            layout,
        })
    }

    fn trace_stage(&self, stage: &'static str, start: Instant) {
        if self.options.trace_stages {
            info!(
                target: "pipeline",
                stage,
                status = "ok",
                elapsed_ms = start.elapsed().as_millis() as u64
            );
        }
    }
}
