//! MIPS assembly emitter.
//!
//! [`AsmEmitter`] accumulates assembly text for one section and offers
//! helpers for the fixed instruction sequences of the calling convention:
//! accumulator push/pop, frame prologue and epilogue.
//!
//! # Registers
//!
//! - `$a0`: accumulator; every expression leaves its result here
//! - `$s0`: the current `self` object
//! - `$fp`: frame pointer; formals above it, locals below it
//! - `$t1`, `$t2`: scratch
//!
//! # Frame
//!
//! ```text
//! 12+4i($fp)  formal i
//!  8($fp)     saved $fp
//!  4($fp)     saved $s0
//!  0($fp)     saved $ra
//! -4k($fp)    local k
//! ```
//!
//! # Example
//!
//! ```
//! use cool_compiler::emit::AsmEmitter;
//!
//! let mut asm = AsmEmitter::new(false);
//! asm.label("Main.main").unwrap();
//! asm.prologue(0).unwrap();
//! asm.ins(format_args!("la $a0 int_const0")).unwrap();
//! asm.epilogue(0, 0).unwrap();
//!
//! let text = asm.finish();
//! assert!(text.starts_with("Main.main:\n"));
//! assert!(text.ends_with("\tjr $ra\n"));
//! ```

mod labels;

use std::fmt::{self, Display, Write};

pub use labels::LabelGenerator;

/// Emit one instruction: `emit!(asm, "lw $a0 {}($fp)", offset)`.
macro_rules! emit {
    ($asm:expr, $($arg:tt)*) => {
        $asm.ins(format_args!($($arg)*))?
    };
}
pub(crate) use emit;

/// Accumulates assembly text.
#[derive(Debug)]
pub struct AsmEmitter {
    out: String,
    /// Whether `#` comments are written.
    annotate: bool,
    instructions: usize,
}

impl AsmEmitter {
    pub fn new(annotate: bool) -> Self {
        Self {
            out: String::new(),
            annotate,
            instructions: 0,
        }
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    /// Emit one indented instruction.
    pub fn ins(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.instructions += 1;
        writeln!(self.out, "\t{args}")
    }

    pub fn label(&mut self, name: impl Display) -> fmt::Result {
        writeln!(self.out, "{name}:")
    }

    /// Emit a section or alignment directive such as `.data`.
    pub fn directive(&mut self, directive: &str) -> fmt::Result {
        writeln!(self.out, "\t{directive}")
    }

    pub fn globl(&mut self, name: impl Display) -> fmt::Result {
        writeln!(self.out, "\t.globl\t{name}")
    }

    pub fn word(&mut self, value: impl Display) -> fmt::Result {
        writeln!(self.out, "\t.word\t{value}")
    }

    /// Emit a NUL-terminated string, escaped for the assembler.
    pub fn asciiz(&mut self, value: &str) -> fmt::Result {
        self.out.push_str("\t.asciiz\t\"");
        for c in value.chars() {
            match c {
                '\\' => self.out.push_str("\\\\"),
                '"' => self.out.push_str("\\\""),
                '\n' => self.out.push_str("\\n"),
                '\t' => self.out.push_str("\\t"),
                '\u{8}' => self.out.push_str("\\b"),
                '\u{c}' => self.out.push_str("\\f"),
                c => self.out.push(c),
            }
        }
        self.out.push_str("\"\n");
        Ok(())
    }

    /// Emit a `#` comment line when annotation is enabled.
    pub fn comment(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        if self.annotate {
            writeln!(self.out, "# {args}")?;
        }
        Ok(())
    }

    // ==========================================================================
    // Stack
    // ==========================================================================

    /// Push the accumulator.
    pub fn push_acc(&mut self) -> fmt::Result {
        self.push("$a0")
    }

    pub fn push(&mut self, reg: &str) -> fmt::Result {
        self.ins(format_args!("sw {reg} 0($sp)"))?;
        self.ins(format_args!("addiu $sp $sp -4"))
    }

    /// Pop the top of the stack into `reg`.
    pub fn pop(&mut self, reg: &str) -> fmt::Result {
        self.ins(format_args!("lw {reg} 4($sp)"))?;
        self.ins(format_args!("addiu $sp $sp 4"))
    }

    // ==========================================================================
    // Frames
    // ==========================================================================

    /// Save `$fp`, `$s0` and `$ra`, set up `$fp`, take `self` from `$a0` and
    /// reserve `locals` words.
    pub fn prologue(&mut self, locals: u32) -> fmt::Result {
        self.ins(format_args!("addiu $sp $sp -12"))?;
        self.ins(format_args!("sw $fp 12($sp)"))?;
        self.ins(format_args!("sw $s0 8($sp)"))?;
        self.ins(format_args!("sw $ra 4($sp)"))?;
        self.ins(format_args!("addiu $fp $sp 4"))?;
        self.ins(format_args!("move $s0 $a0"))?;
        if locals > 0 {
            self.ins(format_args!("addiu $sp $sp -{}", 4 * locals))?;
        }
        Ok(())
    }

    /// Release locals, restore the saved registers, pop the caller's
    /// `params` arguments and return.
    pub fn epilogue(&mut self, locals: u32, params: usize) -> fmt::Result {
        if locals > 0 {
            self.ins(format_args!("addiu $sp $sp {}", 4 * locals))?;
        }
        self.ins(format_args!("lw $fp 12($sp)"))?;
        self.ins(format_args!("lw $s0 8($sp)"))?;
        self.ins(format_args!("lw $ra 4($sp)"))?;
        self.ins(format_args!("addiu $sp $sp {}", 12 + 4 * params))?;
        self.ins(format_args!("jr $ra"))
    }

    // ==========================================================================
    // Output
    // ==========================================================================

    /// Number of instructions emitted so far.
    pub fn instruction_count(&self) -> usize {
        self.instructions
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(asm: &AsmEmitter) -> Vec<&str> {
        asm.as_str().lines().collect()
    }

    #[test]
    fn emit_macro_formats_instruction() -> fmt::Result {
        let mut asm = AsmEmitter::new(false);
        emit!(asm, "lw $a0 {}($fp)", -8);
        assert_eq!(lines(&asm), ["\tlw $a0 -8($fp)"]);
        assert_eq!(asm.instruction_count(), 1);
        Ok(())
    }

    #[test]
    fn push_and_pop() {
        let mut asm = AsmEmitter::new(false);
        asm.push_acc().unwrap();
        asm.pop("$t1").unwrap();
        assert_eq!(
            lines(&asm),
            [
                "\tsw $a0 0($sp)",
                "\taddiu $sp $sp -4",
                "\tlw $t1 4($sp)",
                "\taddiu $sp $sp 4",
            ]
        );
    }

    #[test]
    fn frame_with_locals_and_params() {
        let mut asm = AsmEmitter::new(false);
        asm.prologue(2).unwrap();
        asm.epilogue(2, 3).unwrap();
        let text = lines(&asm);
        assert_eq!(text[0], "\taddiu $sp $sp -12");
        assert_eq!(text[6], "\taddiu $sp $sp -8");
        assert_eq!(text[7], "\taddiu $sp $sp 8");
        assert_eq!(text[11], "\taddiu $sp $sp 24");
        assert_eq!(text[12], "\tjr $ra");
    }

    #[test]
    fn frame_without_locals_skips_adjustment() {
        let mut asm = AsmEmitter::new(false);
        asm.prologue(0).unwrap();
        asm.epilogue(0, 0).unwrap();
        assert_eq!(asm.instruction_count(), 11);
    }

    #[test]
    fn comments_only_when_annotating() {
        let mut quiet = AsmEmitter::new(false);
        quiet.comment(format_args!("class {}", "A")).unwrap();
        assert!(quiet.as_str().is_empty());

        let mut loud = AsmEmitter::new(true);
        loud.comment(format_args!("class {}", "A")).unwrap();
        assert_eq!(loud.as_str(), "# class A\n");
    }

    #[test]
    fn strings_are_escaped() {
        let mut asm = AsmEmitter::new(false);
        asm.asciiz("say \"hi\"\n").unwrap();
        assert_eq!(asm.as_str(), "\t.asciiz\t\"say \\\"hi\\\"\\n\"\n");
    }
}
