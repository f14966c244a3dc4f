//! Code Generator (Pass 4) - lower the annotated program to MIPS assembly.
//!
//! Runs only on a program with zero diagnostics, after layout. Everything it
//! needs is already resolved: static types, bound identifiers, callees and
//! their slots, frame offsets and class tags. A missing annotation at this
//! point is a compiler bug and surfaces as [`CompileError::Internal`].
//!
//! ## Output order
//!
//! The text section is generated first because expression lowering keeps
//! adding literals to the [`ConstantPool`]. The data section is then written
//! from the completed pools and placed in front of the text.
//!
//! - [`constant`]: integer and string literal pools
//! - `data`: constants, class tables, prototypes, dispatch tables
//! - `expr`: expression lowering

pub mod constant;
mod data;
mod expr;

use cool_ast::{ClassDecl, Feature, MethodDecl, NodeId, Program};
use cool_core::{MAIN_CLASS, MAIN_METHOD, SourceMap};
use cool_registry::{ClassId, IdentId, MethodId, SymbolRegistry};
use rustc_hash::FxHashMap;
use tracing::debug;

pub use constant::{ConstantPool, StringConstant};

use crate::annotations::Annotations;
use crate::emit::{AsmEmitter, LabelGenerator, emit};
use crate::error::CompileError;
use crate::options::CompilerOptions;

/// Output of code generation.
#[derive(Debug, Default)]
pub struct CodegenOutput {
    /// The complete assembly program: data section then text section.
    pub assembly: String,
    /// Number of user method bodies emitted.
    pub methods_emitted: usize,
    /// Number of class init routines emitted.
    pub inits_emitted: usize,
    /// Size of the integer pool.
    pub int_constants: usize,
    /// Size of the string pool.
    pub string_constants: usize,
    /// Number of instructions in the text section.
    pub instructions: usize,
}

/// Pass 4: emit assembly.
pub struct CodeGenerator<'a> {
    registry: &'a SymbolRegistry,
    annotations: &'a Annotations,
    sources: &'a SourceMap,
    options: &'a CompilerOptions,
    pool: ConstantPool,
    labels: LabelGenerator,
    text: AsmEmitter,
    /// String constant holding the file name of the class being emitted,
    /// passed to the runtime abort routines.
    file_string: u32,
    methods_emitted: usize,
    inits_emitted: usize,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(
        registry: &'a SymbolRegistry,
        annotations: &'a Annotations,
        sources: &'a SourceMap,
        options: &'a CompilerOptions,
    ) -> Self {
        let pool = ConstantPool::new();
        Self {
            registry,
            annotations,
            sources,
            options,
            file_string: pool.empty_string(),
            pool,
            labels: LabelGenerator::new(),
            text: AsmEmitter::new(options.annotate_asm),
            methods_emitted: 0,
            inits_emitted: 0,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, program: &Program<'_>) -> Result<CodegenOutput, CompileError> {
        let classes = self.classes_by_tag()?;
        for &class in &classes {
            self.pool.add_string(self.registry.class_name(class));
        }

        let mut decls: FxHashMap<ClassId, &ClassDecl<'_>> = FxHashMap::default();
        for decl in program.classes() {
            if let Some(id) = self.annotations.class(decl.id) {
                decls.insert(id, decl);
            }
        }

        for &class in &classes {
            self.emit_init(class, decls.get(&class).copied())?;
        }
        for decl in program.classes() {
            self.emit_methods(decl)?;
        }
        self.emit_main_alias()?;

        let mut data = AsmEmitter::new(self.options.annotate_asm);
        self.emit_data(&mut data, &classes)?;

        let instructions = self.text.instruction_count();
        let mut assembly = data.finish();
        assembly.push_str(self.text.as_str());

        debug!(
            target: "cool::codegen",
            classes = classes.len(),
            methods = self.methods_emitted,
            ints = self.pool.int_count(),
            strings = self.pool.string_count(),
            labels = self.labels.issued(),
            instructions,
            "code generation finished"
        );

        Ok(CodegenOutput {
            assembly,
            methods_emitted: self.methods_emitted,
            inits_emitted: self.inits_emitted,
            int_constants: self.pool.int_count(),
            string_constants: self.pool.string_count(),
            instructions,
        })
    }

    /// Concrete classes ordered by tag. Tags must be exactly `0..n`.
    fn classes_by_tag(&self) -> Result<Vec<ClassId>, CompileError> {
        let mut tagged = Vec::new();
        for (id, class) in self.registry.concrete_classes() {
            let Some(tag) = class.tag else {
                return Err(CompileError::internal(format!("class {} has no tag", class.name)));
            };
            tagged.push((tag, id));
        }
        tagged.sort_unstable();
        for (expected, &(tag, id)) in tagged.iter().enumerate() {
            if tag as usize != expected {
                return Err(CompileError::internal(format!(
                    "class {} has tag {tag}, expected {expected}",
                    self.registry.class_name(id)
                )));
            }
        }
        Ok(tagged.into_iter().map(|(_, id)| id).collect())
    }

    // ==========================================================================
    // Routines
    // ==========================================================================

    /// `X_init`: run the parent's init, then evaluate this class's attribute
    /// initializers in declaration order.
    fn emit_init(
        &mut self,
        class: ClassId,
        decl: Option<&ClassDecl<'_>>,
    ) -> Result<(), CompileError> {
        let registry = self.registry;
        let symbol = registry.class(class);

        self.text.comment(format_args!("init {}", symbol.name))?;
        self.text.label(format_args!("{}_init", symbol.name))?;
        self.text.prologue(symbol.init_locals)?;
        if let Some(parent) = symbol.parent {
            emit!(self.text, "jal {}_init", registry.class_name(parent));
        }

        if let Some(decl) = decl {
            self.enter_file(decl);
            for feature in decl.features {
                let Feature::Attribute(attribute) = *feature else {
                    continue;
                };
                let Some(init) = attribute.init else {
                    continue;
                };
                self.gen_expr(init)?;
                let ident = self.ident(attribute.id)?;
                emit!(self.text, "sw $a0 {}($s0)", registry.ident(ident).offset);
            }
        }

        emit!(self.text, "move $a0 $s0");
        self.text.epilogue(symbol.init_locals, 0)?;
        self.inits_emitted += 1;
        Ok(())
    }

    fn emit_methods(&mut self, decl: &ClassDecl<'_>) -> Result<(), CompileError> {
        let Some(class) = self.annotations.class(decl.id) else {
            return Err(CompileError::internal(format!(
                "class {} was not declared",
                decl.name.text
            )));
        };
        self.enter_file(decl);
        for feature in decl.features {
            if let Feature::Method(method) = *feature {
                self.emit_method(class, method)?;
            }
        }
        Ok(())
    }

    fn emit_method(
        &mut self,
        class: ClassId,
        method: &MethodDecl<'_>,
    ) -> Result<(), CompileError> {
        let registry = self.registry;
        let id = self.method(method.id)?;
        let symbol = registry.method(id);
        let label = format!("{}.{}", registry.class_name(class), symbol.name);

        self.text.comment(format_args!("method {label}"))?;
        self.text.label(&label)?;
        self.text.prologue(symbol.locals)?;
        self.gen_expr(method.body)?;
        self.text.epilogue(symbol.locals, symbol.arity())?;
        self.methods_emitted += 1;
        Ok(())
    }

    /// The runtime enters the program at `Main.main`. When `Main` inherits
    /// its `main`, emit that label as a jump to the inherited body.
    fn emit_main_alias(&mut self) -> Result<(), CompileError> {
        let registry = self.registry;
        let main = registry
            .lookup_class(MAIN_CLASS)
            .ok_or_else(|| CompileError::internal("class Main is missing"))?;
        let method = registry
            .lookup_method(main, MAIN_METHOD)
            .ok_or_else(|| CompileError::internal("method Main.main is missing"))?;
        let owner = registry.method(method).owner;
        if owner != main {
            self.text.label(format_args!("{MAIN_CLASS}.{MAIN_METHOD}"))?;
            emit!(self.text, "j {}.{MAIN_METHOD}", registry.class_name(owner));
        }
        Ok(())
    }

    // ==========================================================================
    // Helpers
    // ==========================================================================

    fn enter_file(&mut self, decl: &ClassDecl<'_>) {
        let file_name = self.sources.file_name(decl.file);
        self.file_string = self.pool.add_string(file_name);
    }

    fn ident(&self, node: NodeId) -> Result<IdentId, CompileError> {
        self.annotations
            .ident(node)
            .ok_or_else(|| CompileError::internal(format!("node {} has no symbol", node.raw())))
    }

    fn method(&self, node: NodeId) -> Result<MethodId, CompileError> {
        self.annotations
            .method(node)
            .ok_or_else(|| CompileError::internal(format!("node {} has no method symbol", node.raw())))
    }

    fn tag(&self, class: ClassId) -> Result<u32, CompileError> {
        self.registry.class(class).tag.ok_or_else(|| {
            CompileError::internal(format!(
                "class {} has no tag",
                self.registry.class_name(class)
            ))
        })
    }
}
