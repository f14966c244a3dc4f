//! Shared helpers for building programs and inspecting the output.

#![allow(dead_code)]

use coolc::ast::{AstBuilder, ClassDecl, Expr, Feature};
use coolc::core::{FileId, SourceMap, Span};
use coolc::{CompileError, CompiledProgram, Compiler, CompilerOptions};

pub fn sp(line: u32, col: u32) -> Span {
    Span::new(line, col)
}

/// A source map with a single file, `test.cl`.
pub fn single_file() -> (SourceMap, FileId) {
    let mut sources = SourceMap::new();
    let file = sources.add("tests/cases/test.cl");
    (sources, file)
}

/// `class <name> [inherits <parent>] { <features> };` on line `line`.
pub fn class<'ast>(
    b: &AstBuilder<'ast>,
    name: &str,
    parent: Option<&str>,
    features: &[Feature<'ast>],
    file: FileId,
    line: u32,
) -> &'ast ClassDecl<'ast> {
    b.class(
        b.name(name, sp(line, 7)),
        parent.map(|p| b.name(p, sp(line, 20))),
        features,
        file,
    )
}

/// `main(): <ret> { <body> };`
pub fn main_method<'ast>(
    b: &AstBuilder<'ast>,
    ret: &str,
    body: &'ast Expr<'ast>,
    line: u32,
) -> Feature<'ast> {
    b.method(b.name("main", sp(line, 3)), &[], b.name(ret, sp(line, 11)), body)
}

/// `class Main { main(): <ret> { <body> }; };`
pub fn main_class<'ast>(
    b: &AstBuilder<'ast>,
    ret: &str,
    body: &'ast Expr<'ast>,
    file: FileId,
    line: u32,
) -> &'ast ClassDecl<'ast> {
    class(b, "Main", None, &[main_method(b, ret, body, line + 1)], file, line)
}

/// Compile without assembly comments so tests match exact lines.
pub fn compile(
    program: &coolc::ast::Program<'_>,
    sources: &SourceMap,
) -> Result<CompiledProgram, CompileError> {
    Compiler::new(CompilerOptions::new().annotate_asm(false)).compile(program, sources)
}

/// Rendered diagnostics of a failed compilation.
pub fn diagnostics(result: Result<CompiledProgram, CompileError>) -> Vec<String> {
    match result {
        Ok(_) => panic!("expected compilation to fail"),
        Err(err) => err
            .diagnostics()
            .unwrap_or_else(|| panic!("expected semantic errors, got {err}"))
            .iter()
            .map(ToString::to_string)
            .collect(),
    }
}

/// Lines following `label:` up to the next label, trimmed.
pub fn block<'a>(asm: &'a str, label: &str) -> Vec<&'a str> {
    let header = format!("{label}:");
    asm.lines()
        .skip_while(|line| *line != header)
        .skip(1)
        .take_while(|line| line.starts_with('\t'))
        .map(str::trim)
        .collect()
}
