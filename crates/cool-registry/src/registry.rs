//! SymbolRegistry - arena storage for every class, method and identifier.
//!
//! # Storage Model
//!
//! - **Classes** live in one arena indexed by [`ClassId`], with a name index
//!   for O(1) lookup in the single global namespace. The five predefined
//!   classes and the `SELF_TYPE` pseudo-class occupy the first six slots.
//! - **Methods** and **identifiers** live in their own arenas and are
//!   referenced from their owning class or method.
//! - **Scopes** form a parent-linked chain used for identifier lookup.
//!
//! Symbols are created once and never removed. Later passes fill in types,
//! tags, offsets and slots on the same symbols.
//!
//! # Example
//!
//! ```
//! use cool_core::FileId;
//! use cool_registry::{ClassId, SymbolRegistry};
//!
//! let mut registry = SymbolRegistry::new();
//! let a = registry.declare_class("A", FileId::new(0)).unwrap();
//! registry.link_parent(a, ClassId::IO);
//!
//! assert_eq!(registry.lookup_class("A"), Some(a));
//! assert!(registry.lookup_method(a, "out_string").is_some());
//! ```

use rustc_hash::FxHashMap;

use cool_core::{BOOL, FileId, INT, IO, OBJECT, SELF_TYPE, STRING};

use crate::ids::{ClassId, IdentId, MethodId, ScopeId};
use crate::scope::{Scope, ScopeKind};
use crate::symbols::{ClassOrigin, ClassSymbol, IdentKind, IdentSymbol, MethodSymbol};

/// Highest tag among the predefined classes.
pub const LAST_BUILTIN_TAG: u32 = 4;

#[derive(Debug)]
pub struct SymbolRegistry {
    classes: Vec<ClassSymbol>,
    class_by_name: FxHashMap<String, ClassId>,
    methods: Vec<MethodSymbol>,
    idents: Vec<IdentSymbol>,
    scopes: Vec<Scope>,
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolRegistry {
    /// Create a registry holding the predefined classes and their methods.
    pub fn new() -> Self {
        let mut registry = Self {
            classes: Vec::new(),
            class_by_name: FxHashMap::default(),
            methods: Vec::new(),
            idents: Vec::new(),
            scopes: vec![Scope::new(ScopeKind::Global, None)],
        };
        registry.register_builtins();
        registry
    }

    // ==========================================================================
    // Built-ins
    // ==========================================================================

    fn register_builtins(&mut self) {
        let object = self.insert_class(OBJECT, ClassOrigin::Builtin);
        let io = self.insert_class(IO, ClassOrigin::Builtin);
        let int = self.insert_class(INT, ClassOrigin::Builtin);
        let string = self.insert_class(STRING, ClassOrigin::Builtin);
        let boolean = self.insert_class(BOOL, ClassOrigin::Builtin);
        let self_type = self.insert_class(SELF_TYPE, ClassOrigin::SelfType);
        debug_assert_eq!(object, ClassId::OBJECT);
        debug_assert_eq!(self_type, ClassId::SELF_TYPE);

        for (class, tag) in [(object, 0), (io, 1), (int, 2), (string, 3), (boolean, 4)] {
            let symbol = self.class_mut(class);
            symbol.tag = Some(tag);
            symbol.max_tag = Some(tag);
        }
        self.class_mut(object).max_tag = Some(LAST_BUILTIN_TAG);
        for class in [io, int, string, boolean] {
            self.link_parent(class, object);
        }
        // SELF_TYPE resolves through Object for method lookup but is not a child.
        self.class_mut(self_type).parent = Some(object);

        self.builtin_method(object, "abort", &[], OBJECT);
        self.builtin_method(object, "type_name", &[], STRING);
        self.builtin_method(object, "copy", &[], SELF_TYPE);
        self.builtin_method(io, "out_string", &[("x", STRING)], SELF_TYPE);
        self.builtin_method(io, "out_int", &[("x", INT)], SELF_TYPE);
        self.builtin_method(io, "in_string", &[], STRING);
        self.builtin_method(io, "in_int", &[], INT);
        self.builtin_method(string, "length", &[], INT);
        self.builtin_method(string, "concat", &[("s", STRING)], STRING);
        self.builtin_method(string, "substr", &[("i", INT), ("l", INT)], STRING);
    }

    fn builtin_method(
        &mut self,
        class: ClassId,
        name: &str,
        formals: &[(&str, &str)],
        return_type: &str,
    ) {
        let Some(method) = self.declare_method(class, name, return_type) else {
            return;
        };
        let resolved = self.lookup_class(return_type);
        let symbol = self.method_mut(method);
        symbol.builtin = true;
        symbol.return_type = resolved;
        for &(formal, type_name) in formals {
            let ty = self.lookup_class(type_name);
            if let Some(ident) = self.declare_formal(method, formal, type_name) {
                self.ident_mut(ident).ty = ty;
            }
        }
    }

    // ==========================================================================
    // Classes
    // ==========================================================================

    fn insert_class(&mut self, name: &str, origin: ClassOrigin) -> ClassId {
        let id = ClassId::new(self.classes.len() as u32);
        let scope = self.push_scope(ScopeKind::Class(id), Some(ScopeId::GLOBAL));
        self.classes.push(ClassSymbol::new(name, origin, scope));
        self.class_by_name.insert(name.to_string(), id);
        id
    }

    /// Register a user class. Returns `None` if the name is taken.
    pub fn declare_class(&mut self, name: &str, file: FileId) -> Option<ClassId> {
        if self.class_by_name.contains_key(name) {
            return None;
        }
        Some(self.insert_class(name, ClassOrigin::User(file)))
    }

    /// Set `child`'s parent and record it among the parent's children,
    /// detaching it from any previous parent.
    pub fn link_parent(&mut self, child: ClassId, parent: ClassId) {
        if let Some(previous) = self.class_mut(child).parent.replace(parent) {
            self.class_mut(previous).children.retain(|&c| c != child);
        }
        let children = &mut self.class_mut(parent).children;
        if let Err(pos) = children.binary_search(&child) {
            children.insert(pos, child);
        }
    }

    pub fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_by_name.get(name).copied()
    }

    pub fn class(&self, id: ClassId) -> &ClassSymbol {
        &self.classes[id.index()]
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassSymbol {
        &mut self.classes[id.index()]
    }

    pub fn class_name(&self, id: ClassId) -> &str {
        &self.class(id).name
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Every class in registration order, `SELF_TYPE` included.
    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassSymbol)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, class)| (ClassId::new(i as u32), class))
    }

    /// The five predefined classes followed by user classes in declaration order.
    pub fn concrete_classes(&self) -> impl Iterator<Item = (ClassId, &ClassSymbol)> {
        self.classes()
            .filter(|(_, class)| class.origin != ClassOrigin::SelfType)
    }

    // ==========================================================================
    // Methods
    // ==========================================================================

    /// Add a method to `class`. Returns `None` if the class already declares it.
    pub fn declare_method(
        &mut self,
        class: ClassId,
        name: &str,
        return_type_name: &str,
    ) -> Option<MethodId> {
        if self.class(class).methods.contains_key(name) {
            return None;
        }
        let id = MethodId::new(self.methods.len() as u32);
        let class_scope = self.class(class).scope;
        let scope = self.push_scope(ScopeKind::Method(id), Some(class_scope));
        self.methods.push(MethodSymbol {
            name: name.to_string(),
            owner: class,
            scope,
            formals: Default::default(),
            return_type_name: return_type_name.to_string(),
            return_type: None,
            slot: None,
            locals: 0,
            builtin: false,
        });
        self.class_mut(class).methods.insert(name.to_string(), id);
        Some(id)
    }

    pub fn method(&self, id: MethodId) -> &MethodSymbol {
        &self.methods[id.index()]
    }

    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodSymbol {
        &mut self.methods[id.index()]
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Find `name` in `class` or its nearest ancestor that defines it.
    pub fn lookup_method(&self, class: ClassId, name: &str) -> Option<MethodId> {
        self.ancestors(class)
            .find_map(|ancestor| self.class(ancestor).methods.get(name).copied())
    }

    // ==========================================================================
    // Identifiers
    // ==========================================================================

    fn push_ident(&mut self, name: &str, kind: IdentKind, type_name: &str) -> IdentId {
        let id = IdentId::new(self.idents.len() as u32);
        self.idents.push(IdentSymbol::new(name, kind, type_name));
        id
    }

    /// Add an attribute to `class`. Returns `None` if the class already declares it.
    pub fn declare_attribute(
        &mut self,
        class: ClassId,
        name: &str,
        type_name: &str,
    ) -> Option<IdentId> {
        if self.class(class).attributes.contains_key(name) {
            return None;
        }
        let id = self.push_ident(name, IdentKind::Attribute, type_name);
        self.class_mut(class).attributes.insert(name.to_string(), id);
        Some(id)
    }

    /// Add a formal to `method`. Returns `None` if the name is already a formal.
    pub fn declare_formal(
        &mut self,
        method: MethodId,
        name: &str,
        type_name: &str,
    ) -> Option<IdentId> {
        if self.method(method).formals.contains_key(name) {
            return None;
        }
        let id = self.push_ident(name, IdentKind::Formal, type_name);
        self.method_mut(method).formals.insert(name.to_string(), id);
        Some(id)
    }

    /// Create a let or case-branch variable and the scope it opens under `parent`.
    pub fn declare_binding(
        &mut self,
        parent: ScopeId,
        name: &str,
        kind: IdentKind,
        type_name: &str,
    ) -> (IdentId, ScopeId) {
        let id = self.push_ident(name, kind, type_name);
        let scope = self.push_scope(ScopeKind::Binding(id), Some(parent));
        (id, scope)
    }

    pub fn ident(&self, id: IdentId) -> &IdentSymbol {
        &self.idents[id.index()]
    }

    pub fn ident_mut(&mut self, id: IdentId) -> &mut IdentSymbol {
        &mut self.idents[id.index()]
    }

    pub fn ident_count(&self) -> usize {
        self.idents.len()
    }

    // ==========================================================================
    // Scopes
    // ==========================================================================

    fn push_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId::new(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, parent));
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Nearest declaration of `name` visible from `scope`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<IdentId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            match scope.kind {
                ScopeKind::Global => return None,
                ScopeKind::Class(class) => return self.lookup_attribute(class, name),
                ScopeKind::Method(method) => {
                    if let Some(&formal) = self.method(method).formals.get(name) {
                        return Some(formal);
                    }
                }
                ScopeKind::Binding(ident) => {
                    if self.ident(ident).name == name {
                        return Some(ident);
                    }
                }
            }
            current = scope.parent;
        }
        None
    }

    /// Find an attribute in `class` or its ancestors.
    pub fn lookup_attribute(&self, class: ClassId, name: &str) -> Option<IdentId> {
        self.ancestors(class)
            .find_map(|ancestor| self.class(ancestor).attributes.get(name).copied())
    }

    /// Class whose body encloses `scope`.
    pub fn enclosing_class(&self, scope: ScopeId) -> Option<ClassId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            match scope.kind {
                ScopeKind::Class(class) => return Some(class),
                ScopeKind::Method(method) => return Some(self.method(method).owner),
                _ => current = scope.parent,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> FileId {
        FileId::new(0)
    }

    #[test]
    fn builtins_registered() {
        let registry = SymbolRegistry::new();
        assert_eq!(registry.lookup_class("Object"), Some(ClassId::OBJECT));
        assert_eq!(registry.lookup_class("IO"), Some(ClassId::IO));
        assert_eq!(registry.lookup_class("SELF_TYPE"), Some(ClassId::SELF_TYPE));
        assert_eq!(registry.class(ClassId::STRING).tag, Some(3));
        assert_eq!(registry.class(ClassId::OBJECT).max_tag, Some(4));
        assert_eq!(
            registry.class(ClassId::OBJECT).children,
            [ClassId::IO, ClassId::INT, ClassId::STRING, ClassId::BOOL]
        );
        assert_eq!(registry.concrete_classes().count(), 5);
    }

    #[test]
    fn builtin_methods_have_signatures() {
        let registry = SymbolRegistry::new();
        let substr = registry.lookup_method(ClassId::STRING, "substr").unwrap();
        let method = registry.method(substr);
        assert_eq!(method.arity(), 2);
        assert_eq!(method.return_type, Some(ClassId::STRING));
        assert!(method.builtin);

        let copy = registry.lookup_method(ClassId::STRING, "copy").unwrap();
        assert_eq!(registry.method(copy).owner, ClassId::OBJECT);
        assert_eq!(registry.method(copy).return_type, Some(ClassId::SELF_TYPE));
    }

    #[test]
    fn class_redeclaration_rejected() {
        let mut registry = SymbolRegistry::new();
        assert!(registry.declare_class("A", file()).is_some());
        assert!(registry.declare_class("A", file()).is_none());
        assert!(registry.declare_class("Int", file()).is_none());
    }

    #[test]
    fn children_kept_in_declaration_order() {
        let mut registry = SymbolRegistry::new();
        let a = registry.declare_class("A", file()).unwrap();
        let b = registry.declare_class("B", file()).unwrap();
        let c = registry.declare_class("C", file()).unwrap();
        registry.link_parent(c, a);
        registry.link_parent(b, a);
        assert_eq!(registry.class(a).children, [b, c]);
    }

    #[test]
    fn relinking_moves_child() {
        let mut registry = SymbolRegistry::new();
        let a = registry.declare_class("A", file()).unwrap();
        let b = registry.declare_class("B", file()).unwrap();
        registry.link_parent(b, ClassId::OBJECT);
        registry.link_parent(b, a);
        assert_eq!(registry.class(b).parent, Some(a));
        assert!(!registry.class(ClassId::OBJECT).children.contains(&b));
        assert_eq!(registry.class(a).children, [b]);
    }

    #[test]
    fn same_scope_collisions() {
        let mut registry = SymbolRegistry::new();
        let a = registry.declare_class("A", file()).unwrap();
        assert!(registry.declare_attribute(a, "x", "Int").is_some());
        assert!(registry.declare_attribute(a, "x", "String").is_none());
        let f = registry.declare_method(a, "f", "Int").unwrap();
        assert!(registry.declare_method(a, "f", "Int").is_none());
        assert!(registry.declare_formal(f, "y", "Int").is_some());
        assert!(registry.declare_formal(f, "y", "Int").is_none());
    }

    #[test]
    fn lookup_walks_outward() {
        let mut registry = SymbolRegistry::new();
        let a = registry.declare_class("A", file()).unwrap();
        let b = registry.declare_class("B", file()).unwrap();
        registry.link_parent(b, a);
        let x = registry.declare_attribute(a, "x", "Int").unwrap();
        let f = registry.declare_method(b, "f", "Int").unwrap();
        let y = registry.declare_formal(f, "y", "Int").unwrap();
        let method_scope = registry.method(f).scope;
        let (shadow, let_scope) =
            registry.declare_binding(method_scope, "x", IdentKind::Let, "String");

        assert_eq!(registry.lookup(method_scope, "x"), Some(x));
        assert_eq!(registry.lookup(method_scope, "y"), Some(y));
        assert_eq!(registry.lookup(let_scope, "x"), Some(shadow));
        assert_eq!(registry.lookup(let_scope, "y"), Some(y));
        assert_eq!(registry.lookup(let_scope, "z"), None);
        assert_eq!(registry.enclosing_class(let_scope), Some(b));
    }

    #[test]
    fn method_lookup_prefers_most_derived() {
        let mut registry = SymbolRegistry::new();
        let a = registry.declare_class("A", file()).unwrap();
        let b = registry.declare_class("B", file()).unwrap();
        registry.link_parent(a, ClassId::IO);
        registry.link_parent(b, a);
        let base = registry.declare_method(a, "f", "Int").unwrap();
        let derived = registry.declare_method(b, "f", "Int").unwrap();
        assert_eq!(registry.lookup_method(b, "f"), Some(derived));
        assert_eq!(registry.lookup_method(a, "f"), Some(base));
        assert!(registry.lookup_method(b, "out_int").is_some());
        assert!(registry.lookup_method(b, "length").is_none());
    }
}
