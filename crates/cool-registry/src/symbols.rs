//! Class, method and identifier symbols.

use cool_core::FileId;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::ids::{ClassId, IdentId, MethodId, ScopeId};

/// Insertion-ordered map with the fast hasher used across the registry.
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Where a class came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassOrigin {
    /// One of the five predefined classes.
    Builtin,
    /// The `SELF_TYPE` pseudo-class.
    SelfType,
    /// Declared in the given source file.
    User(FileId),
}

#[derive(Debug)]
pub struct ClassSymbol {
    pub name: String,
    pub origin: ClassOrigin,
    /// Linked parent. `None` for `Object`, and for classes whose parent is
    /// illegal or not (yet) declared.
    pub parent: Option<ClassId>,
    /// Parent name as written in the source.
    pub parent_name: Option<String>,
    /// Linked children, ordered by declaration.
    pub children: Vec<ClassId>,
    /// Scope holding the attributes.
    pub scope: ScopeId,
    pub attributes: FxIndexMap<String, IdentId>,
    pub methods: FxIndexMap<String, MethodId>,
    pub tag: Option<u32>,
    /// Largest tag in this class's subtree. Only ever widened.
    pub max_tag: Option<u32>,
    /// Peak local slots needed by the attribute initializers.
    pub init_locals: u32,
}

impl ClassSymbol {
    pub(crate) fn new(name: &str, origin: ClassOrigin, scope: ScopeId) -> Self {
        Self {
            name: name.to_string(),
            origin,
            parent: None,
            parent_name: None,
            children: Vec::new(),
            scope,
            attributes: FxIndexMap::default(),
            methods: FxIndexMap::default(),
            tag: None,
            max_tag: None,
            init_locals: 0,
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.origin == ClassOrigin::Builtin
    }

    pub fn file(&self) -> Option<FileId> {
        match self.origin {
            ClassOrigin::User(file) => Some(file),
            _ => None,
        }
    }

    /// Raise `max_tag` to `tag` if it is larger.
    pub fn widen_max_tag(&mut self, tag: u32) {
        self.max_tag = Some(self.max_tag.map_or(tag, |current| current.max(tag)));
    }
}

#[derive(Debug)]
pub struct MethodSymbol {
    pub name: String,
    pub owner: ClassId,
    pub scope: ScopeId,
    /// Formals in declaration order.
    pub formals: FxIndexMap<String, IdentId>,
    pub return_type_name: String,
    pub return_type: Option<ClassId>,
    /// Dispatch-table slot, shared with every override of the same name.
    pub slot: Option<u32>,
    /// Peak number of frame slots the body needs for let and case variables.
    pub locals: u32,
    pub builtin: bool,
}

impl MethodSymbol {
    pub fn arity(&self) -> usize {
        self.formals.len()
    }

    pub fn formal_ids(&self) -> impl Iterator<Item = IdentId> + '_ {
        self.formals.values().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    Attribute,
    Formal,
    Let,
    CaseBranch,
}

#[derive(Debug)]
pub struct IdentSymbol {
    pub name: String,
    pub kind: IdentKind,
    pub type_name: String,
    pub ty: Option<ClassId>,
    /// Byte offset: from the object base for attributes, from `$fp` otherwise.
    pub offset: i32,
}

impl IdentSymbol {
    pub(crate) fn new(name: &str, kind: IdentKind, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            type_name: type_name.to_string(),
            ty: None,
            offset: 0,
        }
    }
}
