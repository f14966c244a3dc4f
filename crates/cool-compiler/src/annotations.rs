//! Per-node side tables filled in by the passes.
//!
//! The AST is immutable once built, so everything a pass learns about a
//! node is recorded here keyed by [`NodeId`]. An absent entry means the pass
//! either did not reach the node or already reported an error for it.

use cool_ast::NodeId;
use cool_registry::{ClassId, IdentId, MethodId, ScopeId};
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct Annotations {
    /// Class declaration → class symbol.
    classes: FxHashMap<NodeId, ClassId>,
    /// Method declaration → method symbol.
    methods: FxHashMap<NodeId, MethodId>,
    /// Attribute, formal, let binding or case branch → identifier symbol.
    idents: FxHashMap<NodeId, IdentId>,
    /// Name-using expression or binding → scope it is resolved in.
    scopes: FxHashMap<NodeId, ScopeId>,
    /// Expression → static type.
    types: FxHashMap<NodeId, ClassId>,
    /// Identifier or assignment → the symbol it refers to.
    bindings: FxHashMap<NodeId, IdentId>,
    /// Dispatch → the method it calls.
    callees: FxHashMap<NodeId, MethodId>,
    /// Case expression → frame offset shared by its branch variables.
    case_slots: FxHashMap<NodeId, i32>,
}

macro_rules! side_table {
    ($field:ident, $get:ident, $set:ident, $value:ty) => {
        pub fn $get(&self, node: NodeId) -> Option<$value> {
            self.$field.get(&node).copied()
        }

        pub fn $set(&mut self, node: NodeId, value: $value) {
            self.$field.insert(node, value);
        }
    };
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    side_table!(classes, class, set_class, ClassId);
    side_table!(methods, method, set_method, MethodId);
    side_table!(idents, ident, set_ident, IdentId);
    side_table!(scopes, scope, set_scope, ScopeId);
    side_table!(types, ty, set_type, ClassId);
    side_table!(bindings, binding, set_binding, IdentId);
    side_table!(callees, callee, set_callee, MethodId);
    side_table!(case_slots, case_slot, set_case_slot, i32);
}
