//! Scoped data context threaded through compiler traversals
//!
//! A `ScopedContext` is a typed key/value map chained to an optional parent.
//! Lookups fall through to the parent; writes always land in the current
//! scope, so a child scope can shadow a value for the duration of a
//! traversal without disturbing its parent. State that must be shared by
//! every scope (for example restrictions emitted by passes) is stored once
//! in the root scope behind a `RefCell`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Namespace for context entries, so two passes storing the same Rust type
/// do not collide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeTag(&'static str);

impl ScopeTag {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// Chained scope of typed values
#[derive(Default)]
pub struct ScopedContext<'p> {
    parent: Option<&'p ScopedContext<'p>>,
    entries: HashMap<(ScopeTag, TypeId), Box<dyn Any>>,
}

impl<'p> ScopedContext<'p> {
    /// Root scope
    pub fn new() -> Self {
        Self {
            parent: None,
            entries: HashMap::new(),
        }
    }

    /// Open a nested scope reading through to `self`
    pub fn child(&self) -> ScopedContext<'_> {
        ScopedContext {
            parent: Some(self),
            entries: HashMap::new(),
        }
    }

    /// Store a value in this scope, replacing any local value under the same key
    pub fn set<T: Any>(&mut self, tag: ScopeTag, value: T) {
        self.entries
            .insert((tag, TypeId::of::<T>()), Box::new(value));
    }

    /// Builder-style `set`
    pub fn with<T: Any>(mut self, tag: ScopeTag, value: T) -> Self {
        self.set(tag, value);
        self
    }

    /// Look a value up in this scope, then in the enclosing scopes
    pub fn get<T: Any>(&self, tag: ScopeTag) -> Option<&T> {
        match self
            .entries
            .get(&(tag, TypeId::of::<T>()))
            .and_then(|entry| entry.downcast_ref::<T>())
        {
            Some(value) => Some(value),
            None => self.parent.and_then(|parent| parent.get(tag)),
        }
    }

    /// True when the value is visible from this scope
    pub fn contains<T: Any>(&self, tag: ScopeTag) -> bool {
        self.get::<T>(tag).is_some()
    }

    /// Remove a value from this scope only; parents are untouched
    pub fn remove<T: Any>(&mut self, tag: ScopeTag) -> Option<T> {
        self.entries
            .remove(&(tag, TypeId::of::<T>()))
            .and_then(|entry| entry.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Number of enclosing scopes
    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |parent| parent.depth() + 1)
    }
}

impl fmt::Debug for ScopedContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&'static str> = self.entries.keys().map(|(tag, _)| tag.name()).collect();
        keys.sort_unstable();
        f.debug_struct("ScopedContext")
            .field("depth", &self.depth())
            .field("keys", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const HINT: ScopeTag = ScopeTag::new("hint");
    const LOG: ScopeTag = ScopeTag::new("log");

    #[test]
    fn test_child_reads_through_to_parent() {
        let root = ScopedContext::new().with(HINT, 32u16);
        let child = root.child();

        assert_eq!(child.get::<u16>(HINT), Some(&32));
        assert_eq!(child.depth(), 1);
        assert_eq!(root.depth(), 0);
    }

    #[test]
    fn test_child_shadows_without_touching_parent() {
        let root = ScopedContext::new().with(HINT, 32u16);
        {
            let mut child = root.child();
            child.set(HINT, 64u16);
            assert_eq!(child.get::<u16>(HINT), Some(&64));
        }
        assert_eq!(root.get::<u16>(HINT), Some(&32));
    }

    #[test]
    fn test_keys_are_typed() {
        let ctx = ScopedContext::new().with(HINT, 1u16).with(HINT, "text");

        assert_eq!(ctx.get::<u16>(HINT), Some(&1));
        assert_eq!(ctx.get::<&str>(HINT), Some(&"text"));
        assert_eq!(ctx.get::<u32>(HINT), None);
        assert!(!ctx.contains::<u16>(LOG));
    }

    #[test]
    fn test_shared_state_in_root() {
        let root = ScopedContext::new().with(LOG, RefCell::new(Vec::<String>::new()));
        {
            let child = root.child();
            let grandchild = child.child();
            grandchild
                .get::<RefCell<Vec<String>>>(LOG)
                .unwrap()
                .borrow_mut()
                .push("x <= 0".to_string());
        }

        let log = root.get::<RefCell<Vec<String>>>(LOG).unwrap().borrow();
        assert_eq!(log.as_slice(), ["x <= 0".to_string()]);
    }

    #[test]
    fn test_remove_is_local() {
        let root = ScopedContext::new().with(HINT, 8u16);
        let mut child = root.child();
        child.set(HINT, 16u16);

        assert_eq!(child.remove::<u16>(HINT), Some(16));
        assert_eq!(child.get::<u16>(HINT), Some(&8));
        assert_eq!(child.remove::<u16>(HINT), None);
    }
}
