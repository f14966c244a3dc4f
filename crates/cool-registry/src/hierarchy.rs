//! Inheritance queries: ancestor walks, subtyping, joins and tag ranges.
//!
//! Every walk is bounded by the number of registered classes, so queries
//! stay finite on hierarchies that still contain a cycle.

use rustc_hash::FxHashSet;

use crate::ids::ClassId;
use crate::registry::SymbolRegistry;

/// Iterator from a class up to the root, starting with the class itself.
pub struct Ancestors<'a> {
    registry: &'a SymbolRegistry,
    next: Option<ClassId>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = ClassId;

    fn next(&mut self) -> Option<ClassId> {
        let current = self.next?;
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.next = self.registry.class(current).parent;
        Some(current)
    }
}

impl SymbolRegistry {
    pub fn ancestors(&self, class: ClassId) -> Ancestors<'_> {
        Ancestors {
            registry: self,
            next: Some(class),
            remaining: self.class_count(),
        }
    }

    /// Classes from the root down to `class`, inclusive.
    pub fn inheritance_chain(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain: Vec<ClassId> = self.ancestors(class).collect();
        chain.reverse();
        chain
    }

    /// Whether following parent links from `class` revisits a class.
    pub fn has_cycle(&self, class: ClassId) -> bool {
        let mut visited = FxHashSet::default();
        visited.insert(class);
        let mut current = self.class(class).parent;
        while let Some(id) = current {
            if !visited.insert(id) {
                return true;
            }
            current = self.class(id).parent;
        }
        false
    }

    /// Number of parent hops from `child` up to `ancestor`, if it is one.
    pub fn distance(&self, child: ClassId, ancestor: ClassId) -> Option<usize> {
        self.ancestors(child).position(|id| id == ancestor)
    }

    pub fn is_subclass(&self, child: ClassId, ancestor: ClassId) -> bool {
        self.distance(child, ancestor).is_some()
    }

    /// Whether a value of static type `child` may be stored where `parent` is
    /// expected, inside a class whose self type is `self_class`.
    ///
    /// `SELF_TYPE` is replaced by `self_class` on the source side only; a
    /// `SELF_TYPE` target accepts nothing but `SELF_TYPE`.
    pub fn conforms(&self, child: ClassId, parent: ClassId, self_class: ClassId) -> bool {
        if child == parent {
            return true;
        }
        if parent == ClassId::SELF_TYPE {
            return false;
        }
        let child = self.substitute_self(child, self_class);
        self.is_subclass(child, parent)
    }

    /// Lowest common ancestor of two static types.
    pub fn join(&self, a: ClassId, b: ClassId, self_class: ClassId) -> ClassId {
        if a == ClassId::SELF_TYPE && b == ClassId::SELF_TYPE {
            return ClassId::SELF_TYPE;
        }
        let a = self.substitute_self(a, self_class);
        let b = self.substitute_self(b, self_class);
        let a_chain: FxHashSet<ClassId> = self.ancestors(a).collect();
        self.ancestors(b)
            .find(|id| a_chain.contains(id))
            .unwrap_or(ClassId::OBJECT)
    }

    /// `self_class` if `ty` is `SELF_TYPE`, else `ty`.
    pub fn substitute_self(&self, ty: ClassId, self_class: ClassId) -> ClassId {
        if ty == ClassId::SELF_TYPE { self_class } else { ty }
    }

    /// Inclusive tag intervals covering `class` and all its descendants,
    /// sorted and with adjacent intervals merged.
    ///
    /// A user class's subtree is a single interval. `IO`'s tag is fixed
    /// below the user range, so it can yield two.
    pub fn tag_ranges(&self, class: ClassId) -> Vec<(u32, u32)> {
        let mut tags = Vec::new();
        let mut stack = vec![class];
        let mut seen = FxHashSet::default();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let symbol = self.class(id);
            if let Some(tag) = symbol.tag {
                tags.push(tag);
            }
            stack.extend(symbol.children.iter().copied());
        }
        tags.sort_unstable();

        let mut ranges: Vec<(u32, u32)> = Vec::new();
        for tag in tags {
            match ranges.last_mut() {
                Some((_, hi)) if *hi + 1 >= tag => *hi = (*hi).max(tag),
                _ => ranges.push((tag, tag)),
            }
        }
        ranges
    }
}
