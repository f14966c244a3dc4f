//! Expression lowering.
//!
//! Every expression leaves its value in `$a0`. Binary operators evaluate the
//! left operand first and keep it on the stack while the right one runs.
//! Call arguments are evaluated left to right into a block reserved below
//! the stack pointer, so the first argument ends up nearest the callee's
//! frame, exactly where pushing them in reverse order would put it.

use cool_ast::{BinaryOp, CaseBranch, Expr, ExprKind, LetBinding, Name, UnaryOp};
use cool_core::{SELF, SELF_TYPE};
use cool_registry::{ClassId, IdentKind};

use super::CodeGenerator;
use crate::emit::emit;
use crate::error::CompileError;
use crate::passes::layout::WORD_SIZE;

/// Byte offset of the value field in `Int`, `Bool` and `String` objects.
const VALUE_OFFSET: i32 = 12;
/// Byte offset of the dispatch table pointer in every object.
const DISPATCH_OFFSET: i32 = 8;

impl CodeGenerator<'_> {
    pub(super) fn gen_expr(&mut self, expr: &Expr<'_>) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Int(value) => {
                let index = self.pool.add_int(*value);
                emit!(self.text, "la $a0 int_const{index}");
            }
            ExprKind::Str(value) => {
                let index = self.pool.add_string(value);
                emit!(self.text, "la $a0 str_const{index}");
            }
            ExprKind::Bool(value) => emit!(self.text, "la $a0 bool_const{}", u8::from(*value)),
            ExprKind::Ident(name) => self.gen_ident(expr, *name)?,
            ExprKind::Binary { op, lhs, rhs } => self.gen_binary(*op, lhs, rhs)?,
            ExprKind::Unary { op, operand } => self.gen_unary(*op, operand)?,
            ExprKind::Assign { value, .. } => {
                self.gen_expr(value)?;
                let (offset, base) = self.variable(expr)?;
                emit!(self.text, "sw $a0 {offset}({base})");
            }
            ExprKind::New { type_name } => self.gen_new(*type_name)?,
            ExprKind::Dispatch {
                receiver,
                static_type,
                args,
                ..
            } => self.gen_dispatch(expr, Some(*receiver), *static_type, args)?,
            ExprKind::SelfDispatch { args, .. } => self.gen_dispatch(expr, None, None, args)?,
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let id = self.labels.next_id("if");
                self.gen_expr(cond)?;
                emit!(self.text, "lw $t1 {VALUE_OFFSET}($a0)");
                emit!(self.text, "beqz $t1 else_{id}");
                self.gen_expr(then_branch)?;
                emit!(self.text, "b endif_{id}");
                self.text.label(format_args!("else_{id}"))?;
                self.gen_expr(else_branch)?;
                self.text.label(format_args!("endif_{id}"))?;
            }
            ExprKind::While { cond, body } => {
                let id = self.labels.next_id("while");
                self.text.label(format_args!("while_{id}"))?;
                self.gen_expr(cond)?;
                emit!(self.text, "lw $t1 {VALUE_OFFSET}($a0)");
                emit!(self.text, "beqz $t1 endwhile_{id}");
                self.gen_expr(body)?;
                emit!(self.text, "b while_{id}");
                self.text.label(format_args!("endwhile_{id}"))?;
                emit!(self.text, "li $a0 0");
            }
            ExprKind::Let { bindings, body } => {
                for binding in bindings.iter() {
                    self.gen_let_binding(binding)?;
                }
                self.gen_expr(body)?;
            }
            ExprKind::Case {
                scrutinee,
                branches,
            } => self.gen_case(expr, scrutinee, branches)?,
            ExprKind::Block(exprs) => {
                for e in exprs.iter() {
                    self.gen_expr(e)?;
                }
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    fn gen_ident(&mut self, expr: &Expr<'_>, name: Name<'_>) -> Result<(), CompileError> {
        if name.is(SELF) {
            emit!(self.text, "move $a0 $s0");
            return Ok(());
        }
        let (offset, base) = self.variable(expr)?;
        emit!(self.text, "lw $a0 {offset}({base})");
        Ok(())
    }

    /// Offset and base register of the variable an identifier or assignment
    /// refers to.
    fn variable(&self, expr: &Expr<'_>) -> Result<(i32, &'static str), CompileError> {
        let ident = self.annotations.binding(expr.id).ok_or_else(|| {
            CompileError::internal(format!("node {} is not bound", expr.id.raw()))
        })?;
        let symbol = self.registry.ident(ident);
        let base = match symbol.kind {
            IdentKind::Attribute => "$s0",
            IdentKind::Formal | IdentKind::Let | IdentKind::CaseBranch => "$fp",
        };
        Ok((symbol.offset, base))
    }

    fn gen_let_binding(&mut self, binding: &LetBinding<'_>) -> Result<(), CompileError> {
        let registry = self.registry;
        let symbol = registry.ident(self.ident(binding.id)?);
        match binding.init {
            Some(init) => self.gen_expr(init)?,
            None => match symbol.ty {
                Some(ClassId::INT) => emit!(self.text, "la $a0 int_const{}", self.pool.zero()),
                Some(ClassId::STRING) => {
                    emit!(self.text, "la $a0 str_const{}", self.pool.empty_string())
                }
                Some(ClassId::BOOL) => emit!(self.text, "la $a0 bool_const0"),
                _ => emit!(self.text, "li $a0 0"),
            },
        }
        emit!(self.text, "sw $a0 {}($fp)", symbol.offset);
        Ok(())
    }

    // ==========================================================================
    // Operators
    // ==========================================================================

    fn gen_binary(&mut self, op: BinaryOp, lhs: &Expr<'_>, rhs: &Expr<'_>) -> Result<(), CompileError> {
        self.gen_expr(lhs)?;
        self.text.push_acc()?;
        self.gen_expr(rhs)?;

        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let instruction = match op {
                    BinaryOp::Add => "add",
                    BinaryOp::Sub => "sub",
                    BinaryOp::Mul => "mul",
                    _ => "div",
                };
                // The result is a fresh copy of the right operand.
                emit!(self.text, "jal Object.copy");
                self.text.pop("$t1")?;
                emit!(self.text, "lw $t1 {VALUE_OFFSET}($t1)");
                emit!(self.text, "lw $t2 {VALUE_OFFSET}($a0)");
                emit!(self.text, "{instruction} $t1 $t1 $t2");
                emit!(self.text, "sw $t1 {VALUE_OFFSET}($a0)");
            }
            BinaryOp::Less | BinaryOp::LessEq => {
                let id = self.labels.next_id("compare");
                let branch = if op == BinaryOp::Less { "blt" } else { "ble" };
                self.text.pop("$t1")?;
                emit!(self.text, "lw $t1 {VALUE_OFFSET}($t1)");
                emit!(self.text, "lw $t2 {VALUE_OFFSET}($a0)");
                emit!(self.text, "la $a0 bool_const1");
                emit!(self.text, "{branch} $t1 $t2 compare_{id}");
                emit!(self.text, "la $a0 bool_const0");
                self.text.label(format_args!("compare_{id}"))?;
            }
            BinaryOp::Equal => {
                let id = self.labels.next_id("equal");
                self.text.pop("$t1")?;
                emit!(self.text, "move $t2 $a0");
                emit!(self.text, "la $a0 bool_const1");
                emit!(self.text, "beq $t1 $t2 equal_{id}");
                emit!(self.text, "la $a1 bool_const0");
                emit!(self.text, "jal equality_test");
                self.text.label(format_args!("equal_{id}"))?;
            }
        }
        Ok(())
    }

    fn gen_unary(&mut self, op: UnaryOp, operand: &Expr<'_>) -> Result<(), CompileError> {
        self.gen_expr(operand)?;
        match op {
            UnaryOp::Neg => {
                emit!(self.text, "jal Object.copy");
                emit!(self.text, "lw $t1 {VALUE_OFFSET}($a0)");
                emit!(self.text, "neg $t1 $t1");
                emit!(self.text, "sw $t1 {VALUE_OFFSET}($a0)");
            }
            UnaryOp::Not => {
                let id = self.labels.next_id("not");
                emit!(self.text, "lw $t1 {VALUE_OFFSET}($a0)");
                emit!(self.text, "la $a0 bool_const1");
                emit!(self.text, "beqz $t1 not_{id}");
                emit!(self.text, "la $a0 bool_const0");
                self.text.label(format_args!("not_{id}"))?;
            }
            UnaryOp::IsVoid => {
                let id = self.labels.next_id("isvoid");
                emit!(self.text, "move $t1 $a0");
                emit!(self.text, "la $a0 bool_const1");
                emit!(self.text, "beqz $t1 isvoid_{id}");
                emit!(self.text, "la $a0 bool_const0");
                self.text.label(format_args!("isvoid_{id}"))?;
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Objects
    // ==========================================================================

    fn gen_new(&mut self, type_name: Name<'_>) -> Result<(), CompileError> {
        if !type_name.is(SELF_TYPE) {
            emit!(self.text, "la $a0 {}_protObj", type_name.text);
            emit!(self.text, "jal Object.copy");
            emit!(self.text, "jal {}_init", type_name.text);
            return Ok(());
        }

        // Index class_objTab by the runtime tag of self; each entry is a
        // prototype and init routine pair.
        emit!(self.text, "la $t1 class_objTab");
        emit!(self.text, "lw $t2 0($s0)");
        emit!(self.text, "sll $t2 $t2 3");
        emit!(self.text, "addu $t1 $t1 $t2");
        self.text.push("$t1")?;
        emit!(self.text, "lw $a0 0($t1)");
        emit!(self.text, "jal Object.copy");
        self.text.pop("$t1")?;
        emit!(self.text, "lw $t1 4($t1)");
        emit!(self.text, "jalr $t1");
        Ok(())
    }

    fn gen_dispatch(
        &mut self,
        expr: &Expr<'_>,
        receiver: Option<&Expr<'_>>,
        static_type: Option<Name<'_>>,
        args: &[&Expr<'_>],
    ) -> Result<(), CompileError> {
        let callee = self.annotations.callee(expr.id).ok_or_else(|| {
            CompileError::internal(format!("call at node {} has no callee", expr.id.raw()))
        })?;
        let slot = self.registry.method(callee).slot.ok_or_else(|| {
            CompileError::internal(format!(
                "method {} has no dispatch slot",
                self.registry.method(callee).name
            ))
        })?;

        if !args.is_empty() {
            emit!(self.text, "addiu $sp $sp -{}", WORD_SIZE * args.len() as i32);
        }
        for (index, arg) in args.iter().enumerate() {
            self.gen_expr(arg)?;
            emit!(self.text, "sw $a0 {}($sp)", WORD_SIZE * (index as i32 + 1));
        }

        match receiver {
            Some(receiver) => self.gen_expr(receiver)?,
            None => emit!(self.text, "move $a0 $s0"),
        }

        let id = self.labels.next_id("dispatch");
        emit!(self.text, "bnez $a0 dispatch_{id}");
        emit!(self.text, "la $a0 str_const{}", self.file_string);
        emit!(self.text, "li $t1 {}", expr.span.line);
        emit!(self.text, "jal _dispatch_abort");
        self.text.label(format_args!("dispatch_{id}"))?;

        match static_type {
            Some(static_type) => emit!(self.text, "la $t1 {}_dispTab", static_type.text),
            None => emit!(self.text, "lw $t1 {DISPATCH_OFFSET}($a0)"),
        }
        emit!(self.text, "lw $t1 {}($t1)", WORD_SIZE * slot as i32);
        emit!(self.text, "jalr $t1");
        Ok(())
    }

    // ==========================================================================
    // Case
    // ==========================================================================

    /// Branches are tried from the most specific declared type to the least
    /// specific, testing the scrutinee's tag against each branch type's tag
    /// ranges.
    fn gen_case(
        &mut self,
        expr: &Expr<'_>,
        scrutinee: &Expr<'_>,
        branches: &[&CaseBranch<'_>],
    ) -> Result<(), CompileError> {
        let registry = self.registry;
        let slot = self.annotations.case_slot(expr.id).ok_or_else(|| {
            CompileError::internal(format!("case at node {} has no slot", expr.id.raw()))
        })?;

        let mut ordered = Vec::with_capacity(branches.len());
        for &branch in branches {
            let ident = self.ident(branch.id)?;
            let ty = registry.ident(ident).ty.ok_or_else(|| {
                CompileError::internal(format!("case branch {} has no type", branch.name.text))
            })?;
            ordered.push((self.tag(ty)?, ty, branch));
        }
        ordered.sort_by(|a, b| b.0.cmp(&a.0));

        let id = self.labels.next_id("case");
        self.gen_expr(scrutinee)?;
        emit!(self.text, "bnez $a0 case_{id}");
        emit!(self.text, "la $a0 str_const{}", self.file_string);
        emit!(self.text, "li $t1 {}", expr.span.line);
        emit!(self.text, "jal _case_abort2");
        self.text.label(format_args!("case_{id}"))?;
        emit!(self.text, "sw $a0 {slot}($fp)");
        emit!(self.text, "lw $t1 0($a0)");

        for (_, ty, branch) in ordered {
            let branch_id = self.labels.next_id("casebranch");
            for (lo, hi) in registry.tag_ranges(ty) {
                let test = self.labels.next_id("casetest");
                emit!(self.text, "blt $t1 {lo} casetest_{test}");
                emit!(self.text, "ble $t1 {hi} casebody_{branch_id}");
                self.text.label(format_args!("casetest_{test}"))?;
            }
            emit!(self.text, "b casenext_{branch_id}");
            self.text.label(format_args!("casebody_{branch_id}"))?;
            self.gen_expr(branch.body)?;
            emit!(self.text, "b endcase_{id}");
            self.text.label(format_args!("casenext_{branch_id}"))?;
        }

        emit!(self.text, "lw $a0 {slot}($fp)");
        emit!(self.text, "jal _case_abort");
        self.text.label(format_args!("endcase_{id}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::Annotations;
    use crate::options::CompilerOptions;
    use crate::passes::{DefinitionPass, LayoutPass, ResolutionPass};
    use bumpalo::Bump;
    use cool_ast::{AstBuilder, ClassDecl, Feature, Program};
    use cool_core::{FileId, SourceMap, Span};
    use cool_registry::SymbolRegistry;

    fn sp(line: u32, col: u32) -> Span {
        Span::new(line, col)
    }

    /// Analyze `program` and lower the body of `Main.main` alone.
    fn lower_main(program: &Program<'_>, main: &ClassDecl<'_>) -> String {
        let mut sources = SourceMap::new();
        sources.add("a.cl");
        let mut registry = SymbolRegistry::new();
        let mut annotations = Annotations::new();
        let definition =
            DefinitionPass::new(&mut registry, &mut annotations, &sources).run(program);
        let resolution =
            ResolutionPass::new(&mut registry, &mut annotations, &sources).run(program);
        assert!(definition.diagnostics.is_empty());
        assert!(resolution.diagnostics.is_empty(), "{}", resolution.diagnostics);
        LayoutPass::new(&mut registry, &mut annotations).run(program);

        let options = CompilerOptions::new().annotate_asm(false);
        let mut generator = CodeGenerator::new(&registry, &annotations, &sources, &options);
        generator.enter_file(main);
        let body = main
            .features
            .iter()
            .find_map(|feature| match *feature {
                Feature::Method(method) if method.name.is("main") => Some(method.body),
                _ => None,
            })
            .unwrap();
        generator.gen_expr(body).unwrap();
        generator.text.finish()
    }

    fn main_with<'ast>(
        b: &AstBuilder<'ast>,
        ret: &str,
        body: &'ast Expr<'ast>,
        extra: &[Feature<'ast>],
    ) -> &'ast ClassDecl<'ast> {
        let mut features = vec![b.method(b.name("main", sp(2, 3)), &[], b.name(ret, sp(2, 12)), body)];
        features.extend_from_slice(extra);
        b.class(b.name("Main", sp(1, 7)), None, &features, FileId::new(0))
    }

    #[test]
    fn arithmetic_copies_right_operand() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let body = b.binary(BinaryOp::Add, b.int(40, sp(2, 20)), b.int(2, sp(2, 25)), sp(2, 23));
        let main = main_with(&b, "Int", body, &[]);
        let asm = lower_main(&b.program(&[main]), main);

        let lines: Vec<_> = asm.lines().map(str::trim).collect();
        assert_eq!(
            lines,
            [
                "la $a0 int_const7",
                "sw $a0 0($sp)",
                "addiu $sp $sp -4",
                "la $a0 int_const2",
                "jal Object.copy",
                "lw $t1 4($sp)",
                "addiu $sp $sp 4",
                "lw $t1 12($t1)",
                "lw $t2 12($a0)",
                "add $t1 $t1 $t2",
                "sw $t1 12($a0)",
            ]
        );
    }

    #[test]
    fn repeated_constructs_get_unique_labels() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let first = b.conditional(b.boolean(true, sp(3, 4)), b.int(1, sp(3, 14)), b.int(2, sp(3, 21)), sp(3, 1));
        let second = b.conditional(b.boolean(false, sp(4, 4)), b.int(1, sp(4, 14)), b.int(2, sp(4, 21)), sp(4, 1));
        let body = b.block(&[first, second], sp(2, 20));
        let main = main_with(&b, "Int", body, &[]);
        let asm = lower_main(&b.program(&[main]), main);

        for label in ["else_0:", "endif_0:", "else_1:", "endif_1:"] {
            assert_eq!(asm.lines().filter(|l| *l == label).count(), 1, "{label}");
        }
        assert!(asm.contains("\tla $a0 bool_const0\n"));
    }

    #[test]
    fn dispatch_evaluates_args_left_to_right_and_checks_void() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        // (new IO).out_string("hi")
        let call = b.dispatch(
            b.new_object(b.name("IO", sp(2, 25)), sp(2, 21)),
            None,
            b.name("out_string", sp(2, 29)),
            &[b.string("hi", sp(2, 40))],
            sp(2, 28),
        );
        let main = main_with(&b, "Object", call, &[]);
        let asm = lower_main(&b.program(&[main]), main);
        let lines: Vec<_> = asm.lines().map(str::trim).collect();

        assert_eq!(lines[0], "addiu $sp $sp -4");
        assert!(lines[1].starts_with("la $a0 str_const"));
        assert_eq!(lines[2], "sw $a0 4($sp)");
        assert_eq!(lines[3], "la $a0 IO_protObj");
        assert_eq!(lines[6], "bnez $a0 dispatch_0");
        assert_eq!(lines[8], "li $t1 2");
        assert_eq!(lines[9], "jal _dispatch_abort");
        assert_eq!(lines[11], "lw $t1 8($a0)");
        // abort, type_name, copy, out_string
        assert_eq!(lines[12], "lw $t1 12($t1)");
        assert_eq!(lines[13], "jalr $t1");
    }

    #[test]
    fn static_dispatch_uses_named_table() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let call = b.dispatch(
            b.ident(b.name("self", sp(2, 20))),
            Some(b.name("Object", sp(2, 25))),
            b.name("type_name", sp(2, 32)),
            &[],
            sp(2, 24),
        );
        let main = main_with(&b, "String", call, &[]);
        let asm = lower_main(&b.program(&[main]), main);
        assert!(asm.contains("\tla $t1 Object_dispTab\n\tlw $t1 4($t1)\n\tjalr $t1\n"));
    }

    #[test]
    fn case_tries_most_specific_branch_first() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let object = b.case_branch(b.name("o", sp(3, 5)), b.name("Object", sp(3, 9)), b.int(0, sp(3, 19)));
        let int = b.case_branch(b.name("i", sp(4, 5)), b.name("Int", sp(4, 9)), b.int(1, sp(4, 16)));
        let case = b.case(b.int(5, sp(2, 25)), &[object, int], sp(2, 20));
        let main = main_with(&b, "Int", case, &[]);
        let asm = lower_main(&b.program(&[main]), main);

        let int_test = asm.find("\tblt $t1 2 ").unwrap();
        let object_test = asm.find("\tblt $t1 0 ").unwrap();
        assert!(int_test < object_test);
        assert!(asm.contains("\tsw $a0 -4($fp)\n\tlw $t1 0($a0)\n"));
        assert!(asm.contains("\tjal _case_abort2\n"));
        assert!(asm.contains("\tlw $a0 -4($fp)\n\tjal _case_abort\nendcase_0:\n"));
    }

    #[test]
    fn let_without_initializer_uses_type_default() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let s = b.let_binding(b.name("s", sp(2, 24)), b.name("String", sp(2, 27)), None);
        let o = b.let_binding(b.name("o", sp(2, 35)), b.name("Object", sp(2, 38)), None);
        let body = b.let_in(&[s, o], b.ident(b.name("s", sp(2, 48))), sp(2, 20));
        let main = main_with(&b, "String", body, &[]);
        let asm = lower_main(&b.program(&[main]), main);
        assert_eq!(
            asm,
            "\tla $a0 str_const0\n\tsw $a0 -4($fp)\n\tli $a0 0\n\tsw $a0 -8($fp)\n\tlw $a0 -4($fp)\n"
        );
    }

    #[test]
    fn attributes_are_addressed_through_self() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let assign = b.assign(b.name("x", sp(2, 20)), b.int(3, sp(2, 25)), sp(2, 22));
        let x = b.attribute(b.name("x", sp(3, 3)), b.name("Int", sp(3, 6)), None);
        let main = main_with(&b, "Int", assign, &[x]);
        let asm = lower_main(&b.program(&[main]), main);
        assert_eq!(asm, "\tla $a0 int_const3\n\tsw $a0 12($s0)\n");
    }

    #[test]
    fn new_self_type_indexes_object_table() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let body = b.new_object(b.name("SELF_TYPE", sp(2, 24)), sp(2, 20));
        let main = main_with(&b, "SELF_TYPE", body, &[]);
        let asm = lower_main(&b.program(&[main]), main);
        assert!(asm.starts_with("\tla $t1 class_objTab\n\tlw $t2 0($s0)\n\tsll $t2 $t2 3\n"));
        assert!(asm.ends_with("\tlw $t1 4($t1)\n\tjalr $t1\n"));
    }
}
