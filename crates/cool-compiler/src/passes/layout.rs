//! Offset & Tag Pass (Pass 3) - finalize object and frame layout.
//!
//! Runs only on a program that passed resolution, so the class tree is known
//! to be acyclic and rooted at `Object`.
//!
//! ## Class tags
//!
//! Tags are handed out in depth-first preorder over the class tree, children
//! in declaration order, continuing after the predefined tags 0-4. Every
//! class's descendants therefore occupy the tags right after its own, and
//! `max_tag` records the largest tag in the subtree. Tags already assigned are
//! kept and `max_tag` is only ever widened, so running the pass again changes
//! nothing.
//!
//! ## Object layout
//!
//! Attributes follow the three-word object header, ancestors first:
//!
//! ```text
//! 0   class tag
//! 4   object size in words
//! 8   dispatch table pointer
//! 12  first attribute
//! ```
//!
//! ## Dispatch slots
//!
//! Walking the inheritance chain root first, a method name seen for the first
//! time takes the next slot and every override reuses it.
//!
//! ## Frames
//!
//! Formals sit above the saved registers at `12 + 4 * i($fp)`. Let and case
//! variables take negative offsets, one word deeper per nesting level; all
//! branches of one `case` share a single slot.

use cool_ast::{ClassDecl, Expr, ExprKind, Feature, Program};
use cool_registry::{ClassId, LAST_BUILTIN_TAG, SymbolRegistry};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::annotations::Annotations;

/// Size of the object header in bytes.
pub const OBJECT_HEADER_SIZE: i32 = 12;
/// Size of one machine word in bytes.
pub const WORD_SIZE: i32 = 4;
/// Words saved by every frame: `$fp`, `$s0` and `$ra`.
pub const FRAME_SAVED_WORDS: i32 = 3;

/// Output of the layout pass.
#[derive(Debug, Default)]
pub struct LayoutOutput {
    /// Number of classes that received a tag in this run.
    pub classes_tagged: usize,
    /// Largest tag in the program.
    pub max_tag: u32,
    /// Number of method bodies whose frames were laid out.
    pub methods_laid_out: usize,
}

/// Pass 3: assign tags, offsets and slots.
pub struct LayoutPass<'a> {
    registry: &'a mut SymbolRegistry,
    annotations: &'a mut Annotations,
    next_tag: u32,
    classes_tagged: usize,
    methods_laid_out: usize,
}

impl<'a> LayoutPass<'a> {
    pub fn new(registry: &'a mut SymbolRegistry, annotations: &'a mut Annotations) -> Self {
        let next_tag = registry
            .classes()
            .filter_map(|(_, class)| class.tag)
            .max()
            .unwrap_or(LAST_BUILTIN_TAG)
            + 1;
        Self {
            registry,
            annotations,
            next_tag,
            classes_tagged: 0,
            methods_laid_out: 0,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, program: &Program<'_>) -> LayoutOutput {
        let max_tag = self.tag_subtree(ClassId::OBJECT);

        let concrete: Vec<ClassId> = self.registry.concrete_classes().map(|(id, _)| id).collect();
        for class in concrete {
            self.layout_object(class);
        }

        for class in program.classes() {
            self.layout_frames(class);
        }

        debug!(
            target: "cool::passes",
            tagged = self.classes_tagged,
            max_tag,
            methods = self.methods_laid_out,
            "layout pass finished"
        );

        LayoutOutput {
            classes_tagged: self.classes_tagged,
            max_tag,
            methods_laid_out: self.methods_laid_out,
        }
    }

    // ==========================================================================
    // Tags
    // ==========================================================================

    /// Tag `class` and its descendants in preorder. Returns the largest tag
    /// in the subtree.
    ///
    /// Walks an explicit stack; inheritance chains can be arbitrarily deep.
    fn tag_subtree(&mut self, root: ClassId) -> u32 {
        let mut order = Vec::new();
        let mut subtree_max = FxHashMap::default();
        let mut stack = vec![root];
        while let Some(class) = stack.pop() {
            let own = match self.registry.class(class).tag {
                Some(tag) => tag,
                None => {
                    let tag = self.next_tag;
                    self.next_tag += 1;
                    self.classes_tagged += 1;
                    self.registry.class_mut(class).tag = Some(tag);
                    tag
                }
            };
            order.push(class);
            subtree_max.insert(class, own);
            // Reversed so the first declared child is popped next.
            stack.extend(self.registry.class(class).children.iter().rev().copied());
        }

        // Reverse preorder visits every class after all of its descendants.
        for &class in order.iter().rev() {
            let max = subtree_max[&class];
            let symbol = self.registry.class_mut(class);
            symbol.widen_max_tag(max);
            if class == root {
                continue;
            }
            if let Some(parent) = symbol.parent
                && let Some(parent_max) = subtree_max.get_mut(&parent)
            {
                *parent_max = (*parent_max).max(max);
            }
        }
        subtree_max.get(&root).copied().unwrap_or_default()
    }

    // ==========================================================================
    // Objects
    // ==========================================================================

    fn layout_object(&mut self, class: ClassId) {
        let chain = self.registry.inheritance_chain(class);

        let attributes: Vec<_> = chain
            .iter()
            .flat_map(|&ancestor| self.registry.class(ancestor).attributes.values().copied())
            .collect();
        for (index, ident) in attributes.into_iter().enumerate() {
            self.registry.ident_mut(ident).offset = OBJECT_HEADER_SIZE + WORD_SIZE * index as i32;
        }

        let mut slots: FxHashMap<String, u32> = FxHashMap::default();
        let methods: Vec<_> = chain
            .iter()
            .flat_map(|&ancestor| {
                self.registry
                    .class(ancestor)
                    .methods
                    .iter()
                    .map(|(name, &id)| (name.clone(), id))
            })
            .collect();
        for (name, method) in methods {
            let next = slots.len() as u32;
            let slot = *slots.entry(name).or_insert(next);
            self.registry.method_mut(method).slot = Some(slot);
        }
    }

    // ==========================================================================
    // Frames
    // ==========================================================================

    fn layout_frames(&mut self, class: &ClassDecl<'_>) {
        let Some(id) = self.annotations.class(class.id) else {
            return;
        };

        let mut init_locals = 0;
        for feature in class.features {
            match *feature {
                Feature::Attribute(attribute) => {
                    if let Some(init) = attribute.init {
                        let mut peak = 0;
                        self.layout_expr(init, 0, &mut peak);
                        init_locals = init_locals.max(peak);
                    }
                }
                Feature::Method(method) => {
                    let Some(method_id) = self.annotations.method(method.id) else {
                        continue;
                    };
                    let formals: Vec<_> = self.registry.method(method_id).formal_ids().collect();
                    for (index, ident) in formals.into_iter().enumerate() {
                        self.registry.ident_mut(ident).offset =
                            (FRAME_SAVED_WORDS + index as i32) * WORD_SIZE;
                    }

                    let mut peak = 0;
                    self.layout_expr(method.body, 0, &mut peak);
                    self.registry.method_mut(method_id).locals = peak;
                    self.methods_laid_out += 1;
                }
            }
        }
        self.registry.class_mut(id).init_locals = init_locals;
    }

    /// Assign frame offsets to the variables bound inside `expr`. `depth` is
    /// the number of local slots already live; `peak` tracks the maximum.
    fn layout_expr(&mut self, expr: &Expr<'_>, depth: u32, peak: &mut u32) {
        match &expr.kind {
            ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Ident(_)
            | ExprKind::New { .. } => {}
            ExprKind::Binary { lhs, rhs, .. } => {
                self.layout_expr(lhs, depth, peak);
                self.layout_expr(rhs, depth, peak);
            }
            ExprKind::Unary { operand, .. } => self.layout_expr(operand, depth, peak),
            ExprKind::Assign { value, .. } => self.layout_expr(value, depth, peak),
            ExprKind::Dispatch { receiver, args, .. } => {
                self.layout_expr(receiver, depth, peak);
                for arg in args.iter() {
                    self.layout_expr(arg, depth, peak);
                }
            }
            ExprKind::SelfDispatch { args, .. } => {
                for arg in args.iter() {
                    self.layout_expr(arg, depth, peak);
                }
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.layout_expr(cond, depth, peak);
                self.layout_expr(then_branch, depth, peak);
                self.layout_expr(else_branch, depth, peak);
            }
            ExprKind::While { cond, body } => {
                self.layout_expr(cond, depth, peak);
                self.layout_expr(body, depth, peak);
            }
            ExprKind::Block(exprs) => {
                for e in exprs.iter() {
                    self.layout_expr(e, depth, peak);
                }
            }
            ExprKind::Let { bindings, body } => {
                let mut depth = depth;
                for binding in bindings.iter() {
                    if let Some(init) = binding.init {
                        self.layout_expr(init, depth, peak);
                    }
                    if let Some(ident) = self.annotations.ident(binding.id) {
                        depth += 1;
                        *peak = (*peak).max(depth);
                        self.registry.ident_mut(ident).offset = local_offset(depth);
                    }
                }
                self.layout_expr(body, depth, peak);
            }
            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                self.layout_expr(scrutinee, depth, peak);
                let depth = depth + 1;
                *peak = (*peak).max(depth);
                let offset = local_offset(depth);
                self.annotations.set_case_slot(expr.id, offset);
                for branch in branches.iter() {
                    if let Some(ident) = self.annotations.ident(branch.id) {
                        self.registry.ident_mut(ident).offset = offset;
                    }
                    self.layout_expr(branch.body, depth, peak);
                }
            }
        }
    }
}

/// Frame offset of the local at nesting `depth` (1-based).
fn local_offset(depth: u32) -> i32 {
    -WORD_SIZE * depth as i32
}
