//! Resolution Pass (Pass 2) - resolve type names and type-check the program.
//!
//! Runs after every class has been declared and linked, so forward references
//! to classes and methods resolve. The pass:
//!
//! - Verifies the program entry point `Main.main()`
//! - Reports undefined parents and inheritance cycles
//! - Resolves attribute, formal, return, let and case type names
//! - Validates method overrides against the inherited signature
//! - Computes and records the static type of every expression
//!
//! ## Failure propagation
//!
//! A check that fails reports one diagnostic and yields `None`. Every consumer
//! of a `None` type skips its own check silently, so one mistake produces one
//! diagnostic while independent mistakes in sibling subtrees are all reported.

use cool_ast::{
    AttributeDecl, BinaryOp, ClassDecl, Expr, ExprKind, Feature, MethodDecl, Name, Program,
    UnaryOp,
};
use cool_core::{
    Diagnostics, MAIN_CLASS, MAIN_METHOD, SELF, SELF_TYPE, SemanticError, SourceMap,
};
use cool_registry::{ClassId, IdentId, MethodId, SymbolRegistry};
use rustc_hash::FxHashSet;
use tracing::debug;

use super::Reporter;
use crate::annotations::Annotations;

/// Output of the resolution pass.
#[derive(Debug, Default)]
pub struct ResolutionOutput {
    /// Whether `Main.main()` was found. When false nothing else was checked.
    pub entry_point_found: bool,
    /// Number of classes whose bodies were checked.
    pub classes_checked: usize,
    /// Number of method bodies type-checked.
    pub methods_checked: usize,
    /// Number of expressions that received a static type.
    pub expressions_typed: usize,
    /// Errors found by this pass.
    pub diagnostics: Diagnostics,
}

/// Pass 2: resolve types and type-check.
pub struct ResolutionPass<'a> {
    registry: &'a mut SymbolRegistry,
    annotations: &'a mut Annotations,
    reporter: Reporter<'a>,
    /// Class whose body is being checked; `SELF_TYPE` is relative to it.
    current_class: ClassId,
    classes_checked: usize,
    methods_checked: usize,
    expressions_typed: usize,
}

impl<'a> ResolutionPass<'a> {
    pub fn new(
        registry: &'a mut SymbolRegistry,
        annotations: &'a mut Annotations,
        sources: &'a SourceMap,
    ) -> Self {
        Self {
            registry,
            annotations,
            reporter: Reporter::new(sources),
            current_class: ClassId::OBJECT,
            classes_checked: 0,
            methods_checked: 0,
            expressions_typed: 0,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, program: &Program<'_>) -> ResolutionOutput {
        let entry_point_found = self.has_entry_point();
        if entry_point_found {
            for class in program.classes() {
                self.check_class(class);
            }
        } else {
            self.reporter.global(SemanticError::MissingEntryPoint);
        }

        let diagnostics = self.reporter.finish();
        debug!(
            target: "cool::passes",
            entry_point_found,
            classes = self.classes_checked,
            methods = self.methods_checked,
            expressions = self.expressions_typed,
            errors = diagnostics.len(),
            "resolution pass finished"
        );

        ResolutionOutput {
            entry_point_found,
            classes_checked: self.classes_checked,
            methods_checked: self.methods_checked,
            expressions_typed: self.expressions_typed,
            diagnostics,
        }
    }

    fn has_entry_point(&self) -> bool {
        self.registry
            .lookup_class(MAIN_CLASS)
            .and_then(|main| self.registry.lookup_method(main, MAIN_METHOD))
            .is_some_and(|method| self.registry.method(method).arity() == 0)
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    fn check_class(&mut self, class: &ClassDecl<'_>) {
        let Some(id) = self.annotations.class(class.id) else {
            return;
        };
        self.reporter.enter_file(class.file);
        self.current_class = id;

        if let Some(parent) = class.parent
            && self.registry.lookup_class(parent.text).is_none()
        {
            self.reporter.error(
                parent.span,
                SemanticError::UndefinedParent {
                    class: class.name.text.to_string(),
                    parent: parent.text.to_string(),
                },
            );
            return;
        }
        if self.registry.has_cycle(id) {
            self.reporter.error(
                class.name.span,
                SemanticError::InheritanceCycle {
                    class: class.name.text.to_string(),
                },
            );
            return;
        }

        self.classes_checked += 1;
        for feature in class.features {
            match *feature {
                Feature::Attribute(attribute) => self.check_attribute(id, attribute),
                Feature::Method(method) => self.check_method(id, method),
            }
        }
    }

    fn check_attribute(&mut self, class: ClassId, attribute: &AttributeDecl<'_>) {
        let Some(ident) = self.annotations.ident(attribute.id) else {
            return;
        };
        let name = attribute.name.text;

        if let Some(parent) = self.registry.class(class).parent
            && self.registry.lookup_attribute(parent, name).is_some()
        {
            self.reporter.error(
                attribute.name.span,
                SemanticError::InheritedAttributeRedefined {
                    class: self.type_name(class),
                    name: name.to_string(),
                },
            );
            return;
        }

        let declared = self.registry.lookup_class(attribute.type_name.text);
        match declared {
            Some(ty) => self.registry.ident_mut(ident).ty = Some(ty),
            None => self.reporter.error(
                attribute.type_name.span,
                SemanticError::AttributeUndefinedType {
                    class: self.type_name(class),
                    name: name.to_string(),
                    type_name: attribute.type_name.text.to_string(),
                },
            ),
        }

        let Some(init) = attribute.init else {
            return;
        };
        let found = self.check_expr(init);
        if let (Some(found), Some(declared)) = (found, declared)
            && !self.conforms(found, declared)
        {
            self.reporter.error(
                init.span,
                SemanticError::AttributeInitMismatch {
                    name: name.to_string(),
                    found: self.type_name(found),
                    declared: attribute.type_name.text.to_string(),
                },
            );
        }
    }

    fn check_method(&mut self, class: ClassId, method: &MethodDecl<'_>) {
        let Some(id) = self.annotations.method(method.id) else {
            return;
        };
        let name = method.name.text;

        let Some(return_type) = self.registry.lookup_class(method.return_type.text) else {
            self.reporter.error(
                method.return_type.span,
                SemanticError::ReturnTypeUndefined {
                    class: self.type_name(class),
                    method: name.to_string(),
                    type_name: method.return_type.text.to_string(),
                },
            );
            return;
        };
        self.registry.method_mut(id).return_type = Some(return_type);

        for formal in method.formals {
            let Some(ident) = self.annotations.ident(formal.id) else {
                continue;
            };
            match self.registry.lookup_class(formal.type_name.text) {
                Some(ty) => self.registry.ident_mut(ident).ty = Some(ty),
                None => self.reporter.error(
                    formal.type_name.span,
                    SemanticError::FormalUndefinedType {
                        class: self.type_name(class),
                        method: name.to_string(),
                        name: formal.name.text.to_string(),
                        type_name: formal.type_name.text.to_string(),
                    },
                ),
            }
        }

        let inherited = self
            .registry
            .class(class)
            .parent
            .and_then(|parent| self.registry.lookup_method(parent, name));
        if let Some(inherited) = inherited
            && !self.check_override(class, method, inherited)
        {
            return;
        }

        self.methods_checked += 1;
        let Some(found) = self.check_expr(method.body) else {
            return;
        };
        if !self.conforms(found, return_type) {
            self.reporter.error(
                method.body.span,
                SemanticError::MethodBodyMismatch {
                    method: name.to_string(),
                    found: self.type_name(found),
                    declared: method.return_type.text.to_string(),
                },
            );
        }
    }

    /// Compare a method's signature with the one it overrides. Declared type
    /// names must match exactly.
    fn check_override(
        &mut self,
        class: ClassId,
        method: &MethodDecl<'_>,
        inherited: MethodId,
    ) -> bool {
        let name = method.name.text;
        let expected: Vec<(String, String)> = self
            .registry
            .method(inherited)
            .formal_ids()
            .map(|id| {
                let ident = self.registry.ident(id);
                (ident.name.clone(), ident.type_name.clone())
            })
            .collect();

        if expected.len() != method.formals.len() {
            self.reporter.error(
                method.name.span,
                SemanticError::OverrideArity {
                    class: self.type_name(class),
                    method: name.to_string(),
                },
            );
            return false;
        }

        for (formal, (_, expected_type)) in method.formals.iter().zip(&expected) {
            if formal.type_name.text != expected_type {
                self.reporter.error(
                    formal.type_name.span,
                    SemanticError::OverrideFormalType {
                        class: self.type_name(class),
                        method: name.to_string(),
                        formal: formal.name.text.to_string(),
                        expected: expected_type.clone(),
                        found: formal.type_name.text.to_string(),
                    },
                );
                return false;
            }
        }

        let expected_return = &self.registry.method(inherited).return_type_name;
        if method.return_type.text != expected_return {
            let expected = expected_return.clone();
            self.reporter.error(
                method.return_type.span,
                SemanticError::OverrideReturnType {
                    class: self.type_name(class),
                    method: name.to_string(),
                    expected,
                    found: method.return_type.text.to_string(),
                },
            );
            return false;
        }
        true
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    /// Type-check `expr`, record its static type and return it.
    fn check_expr(&mut self, expr: &Expr<'_>) -> Option<ClassId> {
        let ty = self.infer(expr);
        if let Some(ty) = ty {
            self.annotations.set_type(expr.id, ty);
            self.expressions_typed += 1;
        }
        ty
    }

    fn infer(&mut self, expr: &Expr<'_>) -> Option<ClassId> {
        match &expr.kind {
            ExprKind::Int(_) => Some(ClassId::INT),
            ExprKind::Str(_) => Some(ClassId::STRING),
            ExprKind::Bool(_) => Some(ClassId::BOOL),
            ExprKind::Ident(name) => self.check_ident(expr, *name),
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(expr, *op, lhs, rhs),
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand),
            ExprKind::Assign { target, value } => self.check_assign(expr, *target, value),
            ExprKind::New { type_name } => {
                let ty = self.registry.lookup_class(type_name.text);
                if ty.is_none() {
                    self.reporter.error(
                        type_name.span,
                        SemanticError::NewUndefinedType {
                            type_name: type_name.text.to_string(),
                        },
                    );
                }
                ty
            }
            ExprKind::Dispatch {
                receiver,
                static_type,
                method,
                args,
            } => self.check_dispatch(expr, receiver, *static_type, *method, args),
            ExprKind::SelfDispatch { method, args } => {
                let arg_types = self.check_args(args);
                let callee =
                    self.check_call(expr, self.current_class, *method, args, &arg_types)?;
                let return_type = &self.registry.method(callee).return_type_name;
                self.registry.lookup_class(return_type)
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if let Some(found) = self.check_expr(cond)
                    && found != ClassId::BOOL
                {
                    self.reporter.error(
                        cond.span,
                        SemanticError::IfCondition {
                            found: self.type_name(found),
                        },
                    );
                }
                let then_ty = self.check_expr(then_branch);
                let else_ty = self.check_expr(else_branch);
                Some(self.join(then_ty?, else_ty?))
            }
            ExprKind::While { cond, body } => {
                if let Some(found) = self.check_expr(cond)
                    && found != ClassId::BOOL
                {
                    self.reporter.error(
                        cond.span,
                        SemanticError::WhileCondition {
                            found: self.type_name(found),
                        },
                    );
                }
                self.check_expr(body);
                Some(ClassId::OBJECT)
            }
            ExprKind::Let { bindings, body } => {
                for binding in bindings.iter() {
                    let init = binding.init.map(|init| (init, self.check_expr(init)));
                    let Some(ident) = self.annotations.ident(binding.id) else {
                        continue;
                    };
                    let Some(declared) = self.registry.lookup_class(binding.type_name.text)
                    else {
                        self.reporter.error(
                            binding.type_name.span,
                            SemanticError::LetUndefinedType {
                                name: binding.name.text.to_string(),
                                type_name: binding.type_name.text.to_string(),
                            },
                        );
                        continue;
                    };
                    self.registry.ident_mut(ident).ty = Some(declared);

                    if let Some((init, Some(found))) = init
                        && !self.conforms(found, declared)
                    {
                        self.reporter.error(
                            init.span,
                            SemanticError::LetInitMismatch {
                                name: binding.name.text.to_string(),
                                found: self.type_name(found),
                                declared: binding.type_name.text.to_string(),
                            },
                        );
                    }
                }
                self.check_expr(body)
            }
            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                let scrutinee_ty = self.check_expr(scrutinee);
                let mut seen = FxHashSet::default();
                let mut result: Option<ClassId> = None;
                for branch in branches.iter() {
                    let Some(ident) = self.annotations.ident(branch.id) else {
                        continue;
                    };
                    let Some(declared) = self.registry.lookup_class(branch.type_name.text)
                    else {
                        self.reporter.error(
                            branch.type_name.span,
                            SemanticError::CaseUndefinedType {
                                name: branch.name.text.to_string(),
                                type_name: branch.type_name.text.to_string(),
                            },
                        );
                        continue;
                    };
                    if !seen.insert(declared) {
                        self.reporter.error(
                            branch.type_name.span,
                            SemanticError::CaseDuplicateBranch {
                                type_name: branch.type_name.text.to_string(),
                            },
                        );
                    }
                    self.registry.ident_mut(ident).ty = Some(declared);

                    if let Some(body_ty) = self.check_expr(branch.body) {
                        result = Some(match result {
                            Some(acc) => self.join(acc, body_ty),
                            None => body_ty,
                        });
                    }
                }
                scrutinee_ty.and(result)
            }
            ExprKind::Block(exprs) => {
                let mut last = None;
                for e in exprs.iter() {
                    last = self.check_expr(e);
                }
                last
            }
        }
    }

    fn check_ident(&mut self, expr: &Expr<'_>, name: Name<'_>) -> Option<ClassId> {
        if name.is(SELF) {
            return Some(ClassId::SELF_TYPE);
        }
        let scope = self.annotations.scope(expr.id)?;
        let Some(ident) = self.registry.lookup(scope, name.text) else {
            self.reporter.error(
                expr.span,
                SemanticError::UndefinedIdentifier {
                    name: name.text.to_string(),
                },
            );
            return None;
        };
        self.annotations.set_binding(expr.id, ident);
        self.declared_type(ident)
    }

    fn check_binary(
        &mut self,
        expr: &Expr<'_>,
        op: BinaryOp,
        lhs: &Expr<'_>,
        rhs: &Expr<'_>,
    ) -> Option<ClassId> {
        let left = self.check_expr(lhs);
        let right = self.check_expr(rhs);

        // The result type is fixed by the operator, so operand errors do not
        // cascade into the enclosing expression.
        if op == BinaryOp::Equal {
            if let (Some(left), Some(right)) = (left, right) {
                if (left.is_value_type() || right.is_value_type()) && left != right {
                    self.reporter.error(
                        expr.span,
                        SemanticError::IncomparableTypes {
                            left: self.type_name(left),
                            right: self.type_name(right),
                        },
                    );
                }
            }
            return Some(ClassId::BOOL);
        }

        self.expect_operand(op.as_str(), lhs, left, ClassId::INT);
        self.expect_operand(op.as_str(), rhs, right, ClassId::INT);
        if op.is_ordering() {
            Some(ClassId::BOOL)
        } else {
            Some(ClassId::INT)
        }
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr<'_>) -> Option<ClassId> {
        let found = self.check_expr(operand);
        match op {
            UnaryOp::IsVoid => Some(ClassId::BOOL),
            UnaryOp::Neg => {
                self.expect_operand(op.as_str(), operand, found, ClassId::INT);
                Some(ClassId::INT)
            }
            UnaryOp::Not => {
                self.expect_operand(op.as_str(), operand, found, ClassId::BOOL);
                Some(ClassId::BOOL)
            }
        }
    }

    /// Report an operand of the wrong type. An absent type was already
    /// reported where it was computed.
    fn expect_operand(
        &mut self,
        op: &str,
        operand: &Expr<'_>,
        found: Option<ClassId>,
        expected: ClassId,
    ) {
        match found {
            Some(found) if found != expected => self.reporter.error(
                operand.span,
                SemanticError::OperandType {
                    op: op.to_string(),
                    found: self.type_name(found),
                    expected: self.type_name(expected),
                },
            ),
            _ => {}
        }
    }

    fn check_assign(&mut self, expr: &Expr<'_>, target: Name<'_>, value: &Expr<'_>) -> Option<ClassId> {
        let found = self.check_expr(value);
        if target.is(SELF) {
            self.reporter.error(target.span, SemanticError::AssignToSelf);
            return None;
        }

        let scope = self.annotations.scope(expr.id)?;
        let Some(ident) = self.registry.lookup(scope, target.text) else {
            self.reporter.error(
                target.span,
                SemanticError::UndefinedIdentifier {
                    name: target.text.to_string(),
                },
            );
            return None;
        };
        self.annotations.set_binding(expr.id, ident);

        let declared = self.declared_type(ident)?;
        let found = found?;
        if !self.conforms(found, declared) {
            let symbol = self.registry.ident(ident);
            let error = SemanticError::AssignmentMismatch {
                name: symbol.name.clone(),
                found: self.type_name(found),
                declared: symbol.type_name.clone(),
            };
            self.reporter.error(value.span, error);
            return None;
        }
        Some(declared)
    }

    fn check_dispatch(
        &mut self,
        expr: &Expr<'_>,
        receiver: &Expr<'_>,
        static_type: Option<Name<'_>>,
        method: Name<'_>,
        args: &[&Expr<'_>],
    ) -> Option<ClassId> {
        let receiver_ty = self.check_expr(receiver);
        let arg_types = self.check_args(args);
        let receiver_ty = receiver_ty?;

        let base = match static_type {
            Some(static_type) => self.check_static_type(receiver_ty, static_type)?,
            None => self.registry.substitute_self(receiver_ty, self.current_class),
        };

        let callee = self.check_call(expr, base, method, args, &arg_types)?;
        let return_type = &self.registry.method(callee).return_type_name;
        if return_type == SELF_TYPE {
            Some(receiver_ty)
        } else {
            self.registry.lookup_class(return_type)
        }
    }

    fn check_static_type(&mut self, receiver: ClassId, static_type: Name<'_>) -> Option<ClassId> {
        if static_type.is(SELF_TYPE) {
            self.reporter
                .error(static_type.span, SemanticError::StaticDispatchSelfType);
            return None;
        }
        let Some(ty) = self.registry.lookup_class(static_type.text) else {
            self.reporter.error(
                static_type.span,
                SemanticError::StaticDispatchUndefined {
                    type_name: static_type.text.to_string(),
                },
            );
            return None;
        };
        if !self.conforms(receiver, ty) {
            self.reporter.error(
                static_type.span,
                SemanticError::StaticDispatchNotAncestor {
                    type_name: static_type.text.to_string(),
                    receiver: self.type_name(receiver),
                },
            );
            return None;
        }
        Some(ty)
    }

    fn check_args(&mut self, args: &[&Expr<'_>]) -> Vec<Option<ClassId>> {
        args.iter().map(|arg| self.check_expr(arg)).collect()
    }

    /// Resolve `method` starting at `base` and check the arguments against
    /// the declared formal types, re-resolved by name.
    fn check_call(
        &mut self,
        expr: &Expr<'_>,
        base: ClassId,
        method: Name<'_>,
        args: &[&Expr<'_>],
        arg_types: &[Option<ClassId>],
    ) -> Option<MethodId> {
        let Some(callee) = self.registry.lookup_method(base, method.text) else {
            self.reporter.error(
                method.span,
                SemanticError::UndefinedMethod {
                    method: method.text.to_string(),
                    class: self.type_name(base),
                },
            );
            return None;
        };

        let formals: Vec<(String, String)> = self
            .registry
            .method(callee)
            .formal_ids()
            .map(|id| {
                let ident = self.registry.ident(id);
                (ident.name.clone(), ident.type_name.clone())
            })
            .collect();
        if formals.len() != args.len() {
            self.reporter.error(
                method.span,
                SemanticError::WrongArgumentCount {
                    method: method.text.to_string(),
                    class: self.type_name(base),
                },
            );
            return None;
        }

        // Argument errors leave the callee resolved; the call still has the
        // declared return type.
        for ((arg, found), (formal, declared_name)) in args.iter().zip(arg_types).zip(&formals) {
            let (Some(found), Some(declared)) = (*found, self.registry.lookup_class(declared_name))
            else {
                continue;
            };
            if !self.conforms(found, declared) {
                self.reporter.error(
                    arg.span,
                    SemanticError::ArgumentMismatch {
                        method: method.text.to_string(),
                        class: self.type_name(base),
                        found: self.type_name(found),
                        formal: formal.clone(),
                        declared: declared_name.clone(),
                    },
                );
            }
        }

        self.annotations.set_callee(expr.id, callee);
        Some(callee)
    }

    // ==========================================================================
    // Helpers
    // ==========================================================================

    /// Resolved type of an identifier, falling back to its declared name for
    /// symbols whose declaration has not been checked yet.
    fn declared_type(&self, ident: IdentId) -> Option<ClassId> {
        let symbol = self.registry.ident(ident);
        symbol
            .ty
            .or_else(|| self.registry.lookup_class(&symbol.type_name))
    }

    fn conforms(&self, child: ClassId, parent: ClassId) -> bool {
        self.registry.conforms(child, parent, self.current_class)
    }

    fn join(&self, a: ClassId, b: ClassId) -> ClassId {
        self.registry.join(a, b, self.current_class)
    }

    fn type_name(&self, ty: ClassId) -> String {
        self.registry.class_name(ty).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::DefinitionPass;
    use bumpalo::Bump;
    use cool_ast::AstBuilder;
    use cool_core::{FileId, Span};

    fn sp(line: u32, col: u32) -> Span {
        Span::new(line, col)
    }

    struct Analysis {
        registry: SymbolRegistry,
        annotations: Annotations,
        definition: Diagnostics,
        resolution: ResolutionOutput,
    }

    fn analyze(program: &Program<'_>) -> Analysis {
        let mut sources = SourceMap::new();
        sources.add("test.cl");
        let mut registry = SymbolRegistry::new();
        let mut annotations = Annotations::new();
        let definition =
            DefinitionPass::new(&mut registry, &mut annotations, &sources).run(program);
        let resolution =
            ResolutionPass::new(&mut registry, &mut annotations, &sources).run(program);
        Analysis {
            registry,
            annotations,
            definition: definition.diagnostics,
            resolution,
        }
    }

    /// `class Main { main(): <ret> { <body> }; };`
    fn main_class<'ast>(
        b: &AstBuilder<'ast>,
        ret: &str,
        body: &'ast Expr<'ast>,
        extra: &[Feature<'ast>],
    ) -> &'ast ClassDecl<'ast> {
        let mut features = vec![b.method(b.name("main", sp(2, 5)), &[], b.name(ret, sp(2, 13)), body)];
        features.extend_from_slice(extra);
        b.class(b.name("Main", sp(1, 7)), None, &features, FileId::new(0))
    }

    fn messages(analysis: &Analysis) -> Vec<String> {
        analysis.resolution.diagnostics.messages()
    }

    #[test]
    fn missing_entry_point_stops_checking() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let bad = b.binary(BinaryOp::Add, b.int(1, sp(2, 1)), b.string("x", sp(2, 5)), sp(2, 3));
        let m = b.method(b.name("f", sp(2, 1)), &[], b.name("Int", sp(2, 1)), bad);
        let a = b.class(b.name("A", sp(1, 7)), None, &[m], FileId::new(0));
        let analysis = analyze(&b.program(&[a]));

        assert!(!analysis.resolution.entry_point_found);
        assert_eq!(messages(&analysis), ["No method main in class Main"]);
        assert_eq!(
            analysis.resolution.diagnostics.to_string(),
            "Semantic error: No method main in class Main\n"
        );
    }

    #[test]
    fn main_with_parameters_is_not_an_entry_point() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let x = b.formal(b.name("x", sp(2, 10)), b.name("Int", sp(2, 13)));
        let m = b.method(b.name("main", sp(2, 5)), &[x], b.name("Int", sp(2, 20)), b.int(0, sp(2, 26)));
        let main = b.class(b.name("Main", sp(1, 7)), None, &[m], FileId::new(0));
        let analysis = analyze(&b.program(&[main]));
        assert_eq!(messages(&analysis), ["No method main in class Main"]);
    }

    #[test]
    fn let_initializer_mismatch_reported_once() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let binding = b.let_binding(
            b.name("x", sp(2, 25)),
            b.name("Int", sp(2, 28)),
            Some(b.string("hi", sp(2, 35))),
        );
        let body = b.let_in(&[binding], b.ident(b.name("x", sp(2, 43))), sp(2, 21));
        let main = main_class(&b, "Int", body, &[]);
        let analysis = analyze(&b.program(&[main]));

        assert!(analysis.definition.is_empty());
        assert_eq!(
            messages(&analysis),
            ["Type String of initialization expression of identifier x is incompatible with declared type Int"]
        );
        let line = analysis.resolution.diagnostics.iter().next().unwrap().to_string();
        assert!(line.starts_with("\"test.cl\", line 2:35, Semantic error: "));
    }

    #[test]
    fn undefined_parent_and_cycle() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let main = main_class(&b, "Int", b.int(0, sp(2, 20)), &[]);
        let a = b.class(b.name("A", sp(3, 7)), Some(b.name("Missing", sp(3, 18))), &[], FileId::new(0));
        let c = b.class(b.name("C", sp(4, 7)), Some(b.name("D", sp(4, 18))), &[], FileId::new(0));
        let d = b.class(b.name("D", sp(5, 7)), Some(b.name("C", sp(5, 18))), &[], FileId::new(0));
        let analysis = analyze(&b.program(&[main, a, c, d]));

        assert_eq!(
            messages(&analysis),
            [
                "Class A has undefined parent Missing",
                "Inheritance cycle for class C",
                "Inheritance cycle for class D",
            ]
        );
    }

    #[test]
    fn arithmetic_operand_errors_name_each_operand() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let sum = b.binary(
            BinaryOp::Add,
            b.string("a", sp(2, 20)),
            b.boolean(true, sp(2, 26)),
            sp(2, 24),
        );
        let main = main_class(&b, "Object", sum, &[]);
        let analysis = analyze(&b.program(&[main]));
        assert_eq!(
            messages(&analysis),
            [
                "Operand of + has type String instead of Int",
                "Operand of + has type Bool instead of Int",
            ]
        );
        assert_eq!(analysis.annotations.ty(sum.id), Some(ClassId::INT));
    }

    #[test]
    fn equality_on_value_types_requires_same_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let eq = b.binary(BinaryOp::Equal, b.int(1, sp(2, 20)), b.string("1", sp(2, 24)), sp(2, 22));
        let ok = b.binary(
            BinaryOp::Equal,
            b.new_object(b.name("Object", sp(3, 24)), sp(3, 20)),
            b.new_object(b.name("IO", sp(3, 37)), sp(3, 33)),
            sp(3, 31),
        );
        let body = b.block(&[eq, ok], sp(2, 18));
        let main = main_class(&b, "Bool", body, &[]);
        let analysis = analyze(&b.program(&[main]));
        assert_eq!(messages(&analysis), ["Cannot compare Int with String"]);
        assert_eq!(analysis.annotations.ty(ok.id), Some(ClassId::BOOL));
        assert_eq!(analysis.annotations.ty(body.id), Some(ClassId::BOOL));
    }

    #[test]
    fn override_checks() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let main = main_class(&b, "Int", b.int(0, sp(2, 20)), &[]);

        let x = b.formal(b.name("x", sp(4, 7)), b.name("Int", sp(4, 10)));
        let f = b.method(b.name("f", sp(4, 5)), &[x], b.name("Int", sp(4, 17)), b.int(0, sp(4, 23)));
        let g = b.method(b.name("g", sp(5, 5)), &[], b.name("Int", sp(5, 10)), b.int(0, sp(5, 16)));
        let x2 = b.formal(b.name("x", sp(6, 7)), b.name("Int", sp(6, 10)));
        let h = b.method(b.name("h", sp(6, 5)), &[x2], b.name("Int", sp(6, 14)), b.int(0, sp(6, 20)));
        let a = b.class(b.name("A", sp(3, 7)), None, &[f, g, h], FileId::new(0));

        let y = b.formal(b.name("y", sp(8, 7)), b.name("String", sp(8, 10)));
        let z = b.formal(b.name("z", sp(9, 7)), b.name("Int", sp(9, 10)));
        let f2 = b.method(b.name("f", sp(8, 5)), &[y], b.name("Int", sp(8, 20)), b.int(0, sp(8, 26)));
        let g2 = b.method(b.name("g", sp(9, 5)), &[z], b.name("Int", sp(9, 17)), b.int(0, sp(9, 23)));
        let z2 = b.formal(b.name("z", sp(10, 7)), b.name("Int", sp(10, 10)));
        let h2 = b.method(b.name("h", sp(10, 5)), &[z2], b.name("Bool", sp(10, 14)), b.string("x", sp(10, 21)));
        let bb = b.class(b.name("B", sp(7, 7)), Some(b.name("A", sp(7, 18))), &[f2, g2, h2], FileId::new(0));

        let analysis = analyze(&b.program(&[main, a, bb]));
        assert_eq!(
            messages(&analysis),
            [
                "Class B overrides method f but changes type of formal parameter y from Int to String",
                "Class B overrides method g with different number of formal parameters",
                "Class B overrides method h but changes return type from Int to Bool",
            ]
        );
    }

    #[test]
    fn builtin_overrides_are_checked() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let abort = b.method(
            b.name("abort", sp(2, 40)),
            &[],
            b.name("Int", sp(2, 50)),
            b.int(0, sp(2, 56)),
        );
        let main = main_class(&b, "Int", b.int(0, sp(2, 20)), &[abort]);
        let analysis = analyze(&b.program(&[main]));
        assert_eq!(
            messages(&analysis),
            ["Class Main overrides method abort but changes return type from Object to Int"]
        );
    }

    #[test]
    fn dispatch_resolves_callee_and_self_type_result() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        // (new IO).out_string("hi").out_int(1)
        let io = b.new_object(b.name("IO", sp(2, 25)), sp(2, 21));
        let first = b.dispatch(io, None, b.name("out_string", sp(2, 29)), &[b.string("hi", sp(2, 40))], sp(2, 28));
        let second = b.dispatch(first, None, b.name("out_int", sp(2, 46)), &[b.int(1, sp(2, 54))], sp(2, 45));
        let main = main_class(&b, "IO", second, &[]);
        let analysis = analyze(&b.program(&[main]));

        assert!(messages(&analysis).is_empty());
        assert_eq!(analysis.annotations.ty(first.id), Some(ClassId::IO));
        assert_eq!(analysis.annotations.ty(second.id), Some(ClassId::IO));
        let callee = analysis.annotations.callee(second.id).unwrap();
        assert_eq!(analysis.registry.method(callee).name, "out_int");
    }

    #[test]
    fn dispatch_errors() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let missing = b.self_dispatch(b.name("nope", sp(3, 1)), &[]);
        let count = b.dispatch(
            b.string("s", sp(4, 1)),
            None,
            b.name("length", sp(4, 5)),
            &[b.int(1, sp(4, 12))],
            sp(4, 4),
        );
        let arg = b.dispatch(
            b.string("s", sp(5, 1)),
            None,
            b.name("concat", sp(5, 5)),
            &[b.int(1, sp(5, 12))],
            sp(5, 4),
        );
        let stat = b.dispatch(
            b.int(1, sp(6, 1)),
            Some(b.name("String", sp(6, 3))),
            b.name("length", sp(6, 10)),
            &[],
            sp(6, 2),
        );
        let self_static = b.dispatch(
            b.int(1, sp(7, 1)),
            Some(b.name("SELF_TYPE", sp(7, 3))),
            b.name("copy", sp(7, 13)),
            &[],
            sp(7, 2),
        );
        let body = b.block(&[missing, count, arg, stat, self_static], sp(2, 18));
        let main = main_class(&b, "Object", body, &[]);
        let analysis = analyze(&b.program(&[main]));

        assert_eq!(
            messages(&analysis),
            [
                "Undefined method nope in class Main",
                "Method length of class String is applied to wrong number of arguments",
                "In call to method concat of class String, actual type Int of formal parameter s is incompatible with declared type String",
                "Type String of static dispatch is not a superclass of type Int",
                "Type of static dispatch cannot be SELF_TYPE",
            ]
        );
    }

    #[test]
    fn assignment_rules() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let to_self = b.assign(b.name("self", sp(3, 1)), b.int(1, sp(3, 9)), sp(3, 6));
        let undefined = b.assign(b.name("y", sp(4, 1)), b.int(1, sp(4, 6)), sp(4, 3));
        let mismatch = b.assign(b.name("x", sp(5, 1)), b.string("s", sp(5, 6)), sp(5, 3));
        let ok = b.assign(b.name("x", sp(6, 1)), b.int(2, sp(6, 6)), sp(6, 3));
        let body = b.block(&[to_self, undefined, mismatch, ok], sp(2, 18));
        let x = b.attribute(b.name("x", sp(7, 5)), b.name("Int", sp(7, 8)), None);
        let main = main_class(&b, "Int", body, &[x]);
        let analysis = analyze(&b.program(&[main]));

        assert_eq!(
            messages(&analysis),
            [
                "Cannot assign to self",
                "Undefined identifier y",
                "Type String of assigned expression is incompatible with declared type Int of identifier x",
            ]
        );
        assert_eq!(analysis.annotations.ty(ok.id), Some(ClassId::INT));
        assert!(analysis.annotations.binding(ok.id).is_some());
    }

    #[test]
    fn conditions_and_joins() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let main = main_class(&b, "Int", b.int(0, sp(2, 20)), &[]);
        let a = b.class(b.name("A", sp(3, 7)), None, &[], FileId::new(0));
        let bb = b.class(b.name("B", sp(4, 7)), Some(b.name("A", sp(4, 18))), &[], FileId::new(0));
        let c = b.class(b.name("C", sp(5, 7)), Some(b.name("A", sp(5, 18))), &[], FileId::new(0));

        let cond = b.conditional(
            b.int(1, sp(6, 4)),
            b.new_object(b.name("B", sp(6, 15)), sp(6, 11)),
            b.new_object(b.name("C", sp(6, 26)), sp(6, 22)),
            sp(6, 1),
        );
        let lp = b.while_loop(b.string("s", sp(7, 7)), b.int(0, sp(7, 16)), sp(7, 1));
        let body = b.block(&[lp, cond], sp(6, 1));
        let f = b.method(b.name("f", sp(6, 1)), &[], b.name("A", sp(6, 1)), body);
        let d = b.class(b.name("D", sp(8, 7)), None, &[f], FileId::new(0));

        let analysis = analyze(&b.program(&[main, a, bb, c, d]));
        assert_eq!(
            messages(&analysis),
            [
                "While condition has type String instead of Bool",
                "If condition has type Int instead of Bool",
            ]
        );
        assert_eq!(analysis.annotations.ty(cond.id), analysis.registry.lookup_class("A"));
        assert_eq!(analysis.annotations.ty(lp.id), Some(ClassId::OBJECT));
    }

    #[test]
    fn case_branches() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let int_branch = b.case_branch(b.name("i", sp(3, 5)), b.name("Int", sp(3, 9)), b.ident(b.name("i", sp(3, 16))));
        let str_branch = b.case_branch(b.name("s", sp(4, 5)), b.name("String", sp(4, 9)), b.ident(b.name("s", sp(4, 19))));
        let dup = b.case_branch(b.name("j", sp(5, 5)), b.name("Int", sp(5, 9)), b.int(0, sp(5, 16)));
        let undef = b.case_branch(b.name("k", sp(6, 5)), b.name("Nope", sp(6, 9)), b.int(0, sp(6, 17)));
        let case = b.case(b.int(7, sp(2, 25)), &[int_branch, str_branch, dup, undef], sp(2, 20));
        let main = main_class(&b, "Object", case, &[]);
        let analysis = analyze(&b.program(&[main]));

        assert_eq!(
            messages(&analysis),
            [
                "Duplicate branch Int in case statement",
                "Case variable k has undefined type Nope",
            ]
        );
        assert_eq!(analysis.annotations.ty(case.id), Some(ClassId::OBJECT));
        let i = analysis.annotations.ident(int_branch.id).unwrap();
        assert_eq!(analysis.registry.ident(i).ty, Some(ClassId::INT));
    }

    #[test]
    fn self_type_method_result_inside_class() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        // main(): Main { copy() }
        let call = b.self_dispatch(b.name("copy", sp(2, 20)), &[]);
        let main = main_class(&b, "Main", call, &[]);
        let analysis = analyze(&b.program(&[main]));
        assert!(messages(&analysis).is_empty());
        assert_eq!(analysis.annotations.ty(call.id), Some(ClassId::SELF_TYPE));
    }

    #[test]
    fn undefined_identifier_does_not_cascade() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let sum = b.binary(
            BinaryOp::Add,
            b.ident(b.name("nope", sp(2, 20))),
            b.int(1, sp(2, 27)),
            sp(2, 25),
        );
        let main = main_class(&b, "Int", sum, &[]);
        let analysis = analyze(&b.program(&[main]));
        assert_eq!(messages(&analysis), ["Undefined identifier nope"]);
    }

    /// `main(): Int { let b: Int <- <init> in 0 }` plus any extra features.
    fn let_int_b<'ast>(
        b: &AstBuilder<'ast>,
        init: &'ast Expr<'ast>,
        extra: &[Feature<'ast>],
    ) -> &'ast ClassDecl<'ast> {
        let binding = b.let_binding(b.name("b", sp(2, 24)), b.name("Int", sp(2, 27)), Some(init));
        let body = b.let_in(&[binding], b.int(0, sp(2, 50)), sp(2, 20));
        main_class(b, "Int", body, extra)
    }

    #[test]
    fn failed_equality_is_still_bool() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let eq = b.binary(BinaryOp::Equal, b.int(1, sp(2, 35)), b.string("a", sp(2, 39)), sp(2, 37));
        let analysis = analyze(&b.program(&[let_int_b(&b, eq, &[])]));
        assert_eq!(
            messages(&analysis),
            [
                "Cannot compare Int with String",
                "Type Bool of initialization expression of identifier b is incompatible with declared type Int",
            ]
        );
        assert_eq!(analysis.annotations.ty(eq.id), Some(ClassId::BOOL));
    }

    #[test]
    fn failed_comparison_is_still_bool() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let lt = b.binary(BinaryOp::Less, b.string("a", sp(2, 35)), b.int(1, sp(2, 41)), sp(2, 39));
        let analysis = analyze(&b.program(&[let_int_b(&b, lt, &[])]));
        assert_eq!(
            messages(&analysis),
            [
                "Operand of < has type String instead of Int",
                "Type Bool of initialization expression of identifier b is incompatible with declared type Int",
            ]
        );
    }

    #[test]
    fn failed_not_is_still_bool() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let not = b.unary(UnaryOp::Not, b.int(5, sp(2, 39)), sp(2, 35));
        let analysis = analyze(&b.program(&[let_int_b(&b, not, &[])]));
        assert_eq!(
            messages(&analysis),
            [
                "Operand of not has type Int instead of Bool",
                "Type Bool of initialization expression of identifier b is incompatible with declared type Int",
            ]
        );
        assert_eq!(analysis.annotations.ty(not.id), Some(ClassId::BOOL));
    }

    #[test]
    fn failed_arithmetic_is_still_int() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        // let b: Bool <- ~"a" * nope in 0
        let neg = b.unary(UnaryOp::Neg, b.string("a", sp(2, 36)), sp(2, 35));
        let product = b.binary(BinaryOp::Mul, neg, b.ident(b.name("nope", sp(2, 42))), sp(2, 40));
        let binding = b.let_binding(b.name("b", sp(2, 24)), b.name("Bool", sp(2, 27)), Some(product));
        let body = b.let_in(&[binding], b.int(0, sp(2, 50)), sp(2, 20));
        let main = main_class(&b, "Int", body, &[]);
        let analysis = analyze(&b.program(&[main]));
        assert_eq!(
            messages(&analysis),
            [
                "Operand of ~ has type String instead of Int",
                "Undefined identifier nope",
                "Type Int of initialization expression of identifier b is incompatible with declared type Bool",
            ]
        );
        assert_eq!(analysis.annotations.ty(neg.id), Some(ClassId::INT));
        assert_eq!(analysis.annotations.ty(product.id), Some(ClassId::INT));
    }

    #[test]
    fn argument_mismatch_keeps_callee_and_return_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        // f(x: Int): Int { x }; main(): Int { let s: String <- f("a") in 0 }
        let x = b.formal(b.name("x", sp(3, 7)), b.name("Int", sp(3, 10)));
        let f = b.method(b.name("f", sp(3, 5)), &[x], b.name("Int", sp(3, 16)), b.ident(b.name("x", sp(3, 22))));
        let call = b.self_dispatch(b.name("f", sp(2, 37)), &[b.string("a", sp(2, 39))]);
        let binding = b.let_binding(b.name("s", sp(2, 24)), b.name("String", sp(2, 27)), Some(call));
        let body = b.let_in(&[binding], b.int(0, sp(2, 50)), sp(2, 20));
        let main = main_class(&b, "Int", body, &[f]);
        let analysis = analyze(&b.program(&[main]));

        assert_eq!(
            messages(&analysis),
            [
                "In call to method f of class Main, actual type String of formal parameter x is incompatible with declared type Int",
                "Type Int of initialization expression of identifier s is incompatible with declared type String",
            ]
        );
        assert_eq!(analysis.annotations.ty(call.id), Some(ClassId::INT));
        let callee = analysis.annotations.callee(call.id).unwrap();
        assert_eq!(analysis.registry.method(callee).name, "f");
    }

    #[test]
    fn undefined_argument_keeps_callee() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let call = b.dispatch(
            b.string("s", sp(2, 20)),
            None,
            b.name("concat", sp(2, 24)),
            &[b.ident(b.name("nope", sp(2, 31)))],
            sp(2, 23),
        );
        let main = main_class(&b, "String", call, &[]);
        let analysis = analyze(&b.program(&[main]));
        assert_eq!(messages(&analysis), ["Undefined identifier nope"]);
        assert_eq!(analysis.annotations.ty(call.id), Some(ClassId::STRING));
        assert!(analysis.annotations.callee(call.id).is_some());
    }
}
