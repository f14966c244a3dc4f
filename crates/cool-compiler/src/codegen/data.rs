//! Static data: constants, class tables, dispatch tables and prototypes.
//!
//! Every object, constants included, is preceded by a `-1` word used by the
//! runtime's garbage collector as an object marker.

use cool_core::{MAIN_CLASS, MAIN_METHOD};
use cool_registry::{ClassId, IdentId, MethodId};

use super::CodeGenerator;
use crate::emit::AsmEmitter;
use crate::error::CompileError;
use crate::passes::layout::OBJECT_HEADER_SIZE;

/// Symbols the runtime reads from the data section.
const DATA_GLOBALS: [&str; 10] = [
    "class_nameTab",
    "class_objTab",
    "Main_protObj",
    "Int_protObj",
    "String_protObj",
    "bool_const0",
    "bool_const1",
    "_int_tag",
    "_bool_tag",
    "_string_tag",
];

/// Routines the runtime calls in the text section.
const TEXT_GLOBALS: [&str; 4] = ["Main_init", "Int_init", "String_init", "Bool_init"];

const GC_MARKER: i32 = -1;

impl CodeGenerator<'_> {
    pub(super) fn emit_data(
        &self,
        asm: &mut AsmEmitter,
        classes: &[ClassId],
    ) -> Result<(), CompileError> {
        asm.directive(".data")?;
        asm.directive(".align\t2")?;
        for name in DATA_GLOBALS {
            asm.globl(name)?;
        }

        asm.label("_int_tag")?;
        asm.word(self.tag(ClassId::INT)?)?;
        asm.label("_bool_tag")?;
        asm.word(self.tag(ClassId::BOOL)?)?;
        asm.label("_string_tag")?;
        asm.word(self.tag(ClassId::STRING)?)?;

        // No garbage collector.
        asm.globl("_MemMgr_INITIALIZER")?;
        asm.label("_MemMgr_INITIALIZER")?;
        asm.word("_NoGC_Init")?;
        asm.globl("_MemMgr_COLLECTOR")?;
        asm.label("_MemMgr_COLLECTOR")?;
        asm.word("_NoGC_Collect")?;
        asm.globl("_MemMgr_TEST")?;
        asm.label("_MemMgr_TEST")?;
        asm.word(0)?;

        self.emit_constants(asm)?;
        self.emit_class_tables(asm, classes)?;
        for &class in classes {
            self.emit_dispatch_table(asm, class)?;
        }
        for &class in classes {
            self.emit_prototype(asm, class)?;
        }

        asm.globl("heap_start")?;
        asm.label("heap_start")?;
        asm.word(0)?;

        asm.directive(".text")?;
        for name in TEXT_GLOBALS {
            asm.globl(name)?;
        }
        asm.globl(format_args!("{MAIN_CLASS}.{MAIN_METHOD}"))?;
        Ok(())
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    fn emit_constants(&self, asm: &mut AsmEmitter) -> Result<(), CompileError> {
        let string_tag = self.tag(ClassId::STRING)?;
        let int_tag = self.tag(ClassId::INT)?;
        let bool_tag = self.tag(ClassId::BOOL)?;

        asm.comment(format_args!("string constants"))?;
        for (index, constant) in self.pool.strings().iter().enumerate() {
            asm.word(GC_MARKER)?;
            asm.label(format_args!("str_const{index}"))?;
            asm.word(string_tag)?;
            asm.word(constant.size_words())?;
            asm.word("String_dispTab")?;
            asm.word(format_args!("int_const{}", constant.length_index))?;
            asm.asciiz(&constant.value)?;
            asm.directive(".align\t2")?;
        }

        asm.comment(format_args!("int constants"))?;
        for (index, value) in self.pool.ints().iter().enumerate() {
            asm.word(GC_MARKER)?;
            asm.label(format_args!("int_const{index}"))?;
            asm.word(int_tag)?;
            asm.word(4)?;
            asm.word("Int_dispTab")?;
            asm.word(value)?;
        }

        asm.comment(format_args!("bool constants"))?;
        for value in [0, 1] {
            asm.word(GC_MARKER)?;
            asm.label(format_args!("bool_const{value}"))?;
            asm.word(bool_tag)?;
            asm.word(4)?;
            asm.word("Bool_dispTab")?;
            asm.word(value)?;
        }
        Ok(())
    }

    // ==========================================================================
    // Class tables
    // ==========================================================================

    /// `class_nameTab` maps a tag to the class name string; `class_objTab`
    /// maps a tag to the prototype and init routine pair.
    fn emit_class_tables(
        &self,
        asm: &mut AsmEmitter,
        classes: &[ClassId],
    ) -> Result<(), CompileError> {
        asm.label("class_nameTab")?;
        for &class in classes {
            let index = self.string_index(self.registry.class_name(class))?;
            asm.word(format_args!("str_const{index}"))?;
        }

        asm.label("class_objTab")?;
        for &class in classes {
            let name = self.registry.class_name(class);
            asm.word(format_args!("{name}_protObj"))?;
            asm.word(format_args!("{name}_init"))?;
        }
        Ok(())
    }

    fn emit_dispatch_table(
        &self,
        asm: &mut AsmEmitter,
        class: ClassId,
    ) -> Result<(), CompileError> {
        let registry = self.registry;
        asm.label(format_args!("{}_dispTab", registry.class_name(class)))?;
        for method in self.dispatch_table(class)? {
            let symbol = registry.method(method);
            asm.word(format_args!(
                "{}.{}",
                registry.class_name(symbol.owner),
                symbol.name
            ))?;
        }
        Ok(())
    }

    /// Most-derived implementation of every method visible in `class`,
    /// indexed by dispatch slot.
    pub(super) fn dispatch_table(&self, class: ClassId) -> Result<Vec<MethodId>, CompileError> {
        let registry = self.registry;
        let mut table: Vec<Option<MethodId>> = Vec::new();
        for ancestor in registry.inheritance_chain(class) {
            for &method in registry.class(ancestor).methods.values() {
                let slot = registry.method(method).slot.ok_or_else(|| {
                    CompileError::internal(format!(
                        "method {}.{} has no slot",
                        registry.class_name(ancestor),
                        registry.method(method).name
                    ))
                })? as usize;
                if table.len() <= slot {
                    table.resize(slot + 1, None);
                }
                table[slot] = Some(method);
            }
        }
        table
            .into_iter()
            .enumerate()
            .map(|(slot, method)| {
                method.ok_or_else(|| {
                    CompileError::internal(format!(
                        "class {} has an empty dispatch slot {slot}",
                        registry.class_name(class)
                    ))
                })
            })
            .collect()
    }

    // ==========================================================================
    // Prototypes
    // ==========================================================================

    fn emit_prototype(
        &self,
        asm: &mut AsmEmitter,
        class: ClassId,
    ) -> Result<(), CompileError> {
        let registry = self.registry;
        let name = registry.class_name(class);
        let tag = self.tag(class)?;

        asm.comment(format_args!("prototype {name}"))?;
        asm.word(GC_MARKER)?;
        asm.label(format_args!("{name}_protObj"))?;
        asm.word(tag)?;

        // The primitive classes carry a hidden value field.
        match class {
            ClassId::INT | ClassId::BOOL => {
                asm.word(4)?;
                asm.word(format_args!("{name}_dispTab"))?;
                asm.word(0)?;
            }
            ClassId::STRING => {
                asm.word(5)?;
                asm.word(format_args!("{name}_dispTab"))?;
                asm.word(format_args!("int_const{}", self.pool.zero()))?;
                asm.word(0)?;
            }
            _ => {
                let attributes = self.attributes(class);
                asm.word(OBJECT_HEADER_SIZE as usize / 4 + attributes.len())?;
                asm.word(format_args!("{name}_dispTab"))?;
                for ident in attributes {
                    self.emit_default(asm, ident)?;
                }
            }
        }
        Ok(())
    }

    /// Every attribute of `class`, inherited ones first, in offset order.
    fn attributes(&self, class: ClassId) -> Vec<IdentId> {
        let registry = self.registry;
        registry
            .inheritance_chain(class)
            .into_iter()
            .flat_map(|ancestor| registry.class(ancestor).attributes.values().copied())
            .collect()
    }

    /// Initial value of an attribute slot in a prototype.
    fn emit_default(&self, asm: &mut AsmEmitter, ident: IdentId) -> Result<(), CompileError> {
        match self.registry.ident(ident).ty {
            Some(ClassId::INT) => asm.word(format_args!("int_const{}", self.pool.zero()))?,
            Some(ClassId::STRING) => {
                asm.word(format_args!("str_const{}", self.pool.empty_string()))?
            }
            Some(ClassId::BOOL) => asm.word("bool_const0")?,
            _ => asm.word(0)?,
        }
        Ok(())
    }

    fn string_index(&self, value: &str) -> Result<u32, CompileError> {
        self.pool
            .string_index(value)
            .ok_or_else(|| CompileError::internal(format!("string {value:?} was not pooled")))
    }
}
