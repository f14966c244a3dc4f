//! Definition Pass (Pass 1) - declare every symbol and link the class tree.
//!
//! Walks the classes in source order and turns the raw declaration list into
//! a linked, name-resolved (but not yet type-resolved) symbol graph.
//!
//! ## Responsibilities
//!
//! - Register classes, rejecting `SELF_TYPE` as a name and redefinitions
//! - Link each class to its parent; parents declared later are resolved
//!   through a pending-children index drained when the parent appears
//! - Declare attributes, methods, formals, let and case variables
//! - Stamp every name-using expression with the scope it is looked up in
//!
//! Undefined parents and redefinitions of inherited attributes need the
//! complete hierarchy and are reported by the resolution pass.

use cool_ast::{
    AttributeDecl, ClassDecl, Expr, ExprKind, Feature, MethodDecl, Name, Program,
};
use cool_core::{BOOL, Diagnostics, INT, SELF, SELF_TYPE, STRING, SemanticError, SourceMap};
use cool_registry::{ClassId, IdentKind, ScopeId, SymbolRegistry};
use rustc_hash::FxHashMap;
use tracing::debug;

use super::Reporter;
use crate::annotations::Annotations;

/// Output of the definition pass.
#[derive(Debug, Default)]
pub struct DefinitionOutput {
    /// Number of user classes registered.
    pub classes_declared: usize,
    /// Number of user methods registered.
    pub methods_declared: usize,
    /// Number of attributes, formals and local variables registered.
    pub idents_declared: usize,
    /// Errors found by this pass.
    pub diagnostics: Diagnostics,
}

/// Pass 1: declare symbols and link parents.
pub struct DefinitionPass<'a, 'ast> {
    registry: &'a mut SymbolRegistry,
    annotations: &'a mut Annotations,
    reporter: Reporter<'a>,
    /// Classes waiting for a parent that has not been declared yet, keyed by
    /// the parent's name.
    pending: FxHashMap<&'ast str, Vec<ClassId>>,
    classes_declared: usize,
    methods_declared: usize,
    idents_declared: usize,
}

impl<'a, 'ast> DefinitionPass<'a, 'ast> {
    pub fn new(
        registry: &'a mut SymbolRegistry,
        annotations: &'a mut Annotations,
        sources: &'a SourceMap,
    ) -> Self {
        Self {
            registry,
            annotations,
            reporter: Reporter::new(sources),
            pending: FxHashMap::default(),
            classes_declared: 0,
            methods_declared: 0,
            idents_declared: 0,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, program: &Program<'ast>) -> DefinitionOutput {
        for class in program.classes() {
            self.visit_class(class);
        }

        let diagnostics = self.reporter.finish();
        debug!(
            target: "cool::passes",
            classes = self.classes_declared,
            methods = self.methods_declared,
            idents = self.idents_declared,
            unresolved_parents = self.pending.len(),
            errors = diagnostics.len(),
            "definition pass finished"
        );

        DefinitionOutput {
            classes_declared: self.classes_declared,
            methods_declared: self.methods_declared,
            idents_declared: self.idents_declared,
            diagnostics,
        }
    }

    // ==========================================================================
    // Classes
    // ==========================================================================

    fn visit_class(&mut self, class: &'ast ClassDecl<'ast>) {
        self.reporter.enter_file(class.file);
        let name = class.name.text;

        if name == SELF_TYPE {
            self.reporter.error(
                class.name.span,
                SemanticError::IllegalClassName {
                    name: name.to_string(),
                },
            );
            return;
        }

        let Some(id) = self.registry.declare_class(name, class.file) else {
            self.reporter.error(
                class.name.span,
                SemanticError::ClassRedefined {
                    name: name.to_string(),
                },
            );
            return;
        };
        self.classes_declared += 1;

        // Every class hangs off Object until its declared parent is known.
        self.registry.link_parent(id, ClassId::OBJECT);
        if let Some(children) = self.pending.remove(name) {
            for child in children {
                self.registry.link_parent(child, id);
            }
        }

        let mut parent_ok = true;
        if let Some(parent) = class.parent {
            self.registry.class_mut(id).parent_name = Some(parent.text.to_string());
            parent_ok = self.link_declared_parent(id, class.name, parent);
        }
        if parent_ok {
            self.annotations.set_class(class.id, id);
        }

        let scope = self.registry.class(id).scope;
        for feature in class.features {
            match *feature {
                Feature::Attribute(attribute) => self.visit_attribute(id, scope, attribute),
                Feature::Method(method) => self.visit_method(id, method),
            }
        }
    }

    /// Returns false if the parent may never be inherited from.
    fn link_declared_parent(&mut self, id: ClassId, name: Name<'ast>, parent: Name<'ast>) -> bool {
        if matches!(parent.text, INT | STRING | BOOL | SELF_TYPE) {
            self.reporter.error(
                parent.span,
                SemanticError::IllegalParent {
                    class: name.text.to_string(),
                    parent: parent.text.to_string(),
                },
            );
            return false;
        }

        match self.registry.lookup_class(parent.text) {
            Some(parent_id) => self.registry.link_parent(id, parent_id),
            None => self.pending.entry(parent.text).or_default().push(id),
        }
        true
    }

    // ==========================================================================
    // Features
    // ==========================================================================

    fn visit_attribute(&mut self, class: ClassId, scope: ScopeId, attribute: &'ast AttributeDecl<'ast>) {
        let name = attribute.name;
        if name.is(SELF) {
            self.reporter.error(
                name.span,
                SemanticError::AttributeNamedSelf {
                    class: self.registry.class_name(class).to_string(),
                },
            );
            return;
        }

        let Some(ident) =
            self.registry
                .declare_attribute(class, name.text, attribute.type_name.text)
        else {
            self.reporter.error(
                name.span,
                SemanticError::AttributeRedefined {
                    class: self.registry.class_name(class).to_string(),
                    name: name.text.to_string(),
                },
            );
            return;
        };
        self.idents_declared += 1;
        self.annotations.set_ident(attribute.id, ident);

        if let Some(init) = attribute.init {
            self.visit_expr(init, scope);
        }
    }

    fn visit_method(&mut self, class: ClassId, method: &'ast MethodDecl<'ast>) {
        let name = method.name;
        let Some(id) = self
            .registry
            .declare_method(class, name.text, method.return_type.text)
        else {
            self.reporter.error(
                name.span,
                SemanticError::MethodRedefined {
                    class: self.registry.class_name(class).to_string(),
                    name: name.text.to_string(),
                },
            );
            return;
        };
        self.methods_declared += 1;
        self.annotations.set_method(method.id, id);

        let class_name = self.registry.class_name(class).to_string();
        for formal in method.formals {
            if formal.name.is(SELF) {
                self.reporter.error(
                    formal.name.span,
                    SemanticError::FormalNamedSelf {
                        class: class_name.clone(),
                        method: name.text.to_string(),
                    },
                );
                continue;
            }

            let Some(ident) =
                self.registry
                    .declare_formal(id, formal.name.text, formal.type_name.text)
            else {
                self.reporter.error(
                    formal.name.span,
                    SemanticError::FormalRedefined {
                        class: class_name.clone(),
                        method: name.text.to_string(),
                        name: formal.name.text.to_string(),
                    },
                );
                continue;
            };
            self.idents_declared += 1;

            if formal.type_name.is(SELF_TYPE) {
                self.reporter.error(
                    formal.type_name.span,
                    SemanticError::FormalSelfType {
                        class: class_name.clone(),
                        method: name.text.to_string(),
                        name: formal.name.text.to_string(),
                    },
                );
                continue;
            }
            self.annotations.set_ident(formal.id, ident);
        }

        let scope = self.registry.method(id).scope;
        self.visit_expr(method.body, scope);
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn visit_expr(&mut self, expr: &'ast Expr<'ast>, scope: ScopeId) {
        match &expr.kind {
            ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::New { .. } => {}
            ExprKind::Ident(_) => self.annotations.set_scope(expr.id, scope),
            ExprKind::Assign { value, .. } => {
                self.annotations.set_scope(expr.id, scope);
                self.visit_expr(value, scope);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs, scope);
                self.visit_expr(rhs, scope);
            }
            ExprKind::Unary { operand, .. } => self.visit_expr(operand, scope),
            ExprKind::Dispatch { receiver, args, .. } => {
                self.annotations.set_scope(expr.id, scope);
                self.visit_expr(receiver, scope);
                for arg in args.iter() {
                    self.visit_expr(arg, scope);
                }
            }
            ExprKind::SelfDispatch { args, .. } => {
                self.annotations.set_scope(expr.id, scope);
                for arg in args.iter() {
                    self.visit_expr(arg, scope);
                }
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(cond, scope);
                self.visit_expr(then_branch, scope);
                self.visit_expr(else_branch, scope);
            }
            ExprKind::While { cond, body } => {
                self.visit_expr(cond, scope);
                self.visit_expr(body, scope);
            }
            ExprKind::Block(exprs) => {
                for e in exprs.iter() {
                    self.visit_expr(e, scope);
                }
            }
            ExprKind::Let { bindings, body } => {
                let mut current = scope;
                for binding in bindings.iter() {
                    // The initializer cannot see the variable it initializes.
                    if let Some(init) = binding.init {
                        self.visit_expr(init, current);
                    }
                    if binding.name.is(SELF) {
                        self.reporter
                            .error(binding.name.span, SemanticError::LetNamedSelf);
                        continue;
                    }
                    let (ident, inner) = self.registry.declare_binding(
                        current,
                        binding.name.text,
                        IdentKind::Let,
                        binding.type_name.text,
                    );
                    self.idents_declared += 1;
                    self.annotations.set_ident(binding.id, ident);
                    self.annotations.set_scope(binding.id, inner);
                    current = inner;
                }
                self.visit_expr(body, current);
            }
            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                self.visit_expr(scrutinee, scope);
                for branch in branches.iter() {
                    if branch.name.is(SELF) {
                        self.reporter
                            .error(branch.name.span, SemanticError::CaseNamedSelf);
                        continue;
                    }
                    if branch.type_name.is(SELF_TYPE) {
                        self.reporter.error(
                            branch.type_name.span,
                            SemanticError::CaseSelfType {
                                name: branch.name.text.to_string(),
                            },
                        );
                        continue;
                    }
                    let (ident, inner) = self.registry.declare_binding(
                        scope,
                        branch.name.text,
                        IdentKind::CaseBranch,
                        branch.type_name.text,
                    );
                    self.idents_declared += 1;
                    self.annotations.set_ident(branch.id, ident);
                    self.annotations.set_scope(branch.id, inner);
                    self.visit_expr(branch.body, inner);
                }
            }
        }
    }
}
