//! # Per-update context
//!
//! Every update processed by the dispatcher owns one [`Context`]: an open,
//! typed key-value scratchpad shared by rules, middleware, node producers
//! and handlers for the lifetime of that update.
//!
//! `Context` is an `Arc`-backed handle: `clone()` is O(1) and every clone
//! observes the same slots. Use [`Context::copy`] for a detached shallow
//! copy, e.g. when a waiter evaluates its release rule against a candidate
//! update without touching the original bag.
//!
//! Rule combinators use [`Context::snapshot`] / [`Context::restore`] so a
//! boolean branch that is not taken leaves no writes behind.

use crate::node::NodeCache;
use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex},
};

type Slot = Arc<dyn Any + Send + Sync>;

/// The per-update typed key-value bag.
///
/// Values are stored type-erased and recovered with a typed [`get`]. The
/// well-known keys (`raw_update`, rule-published capture names,
/// `enum_text`, ...) are plain string keys; user code is free to add its
/// own.
///
/// [`get`]: Context::get
#[derive(Clone, Default)]
pub struct Context {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    nodes: NodeCache,
}

/// A point-in-time view of a context's slots.
///
/// Produced by [`Context::snapshot`] and consumed by [`Context::restore`].
pub struct Snapshot(HashMap<String, Slot>);

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value stored under `key`, downcast to `T`.
    ///
    /// Returns `None` if the key is absent or holds a different type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let slot = self.slots.lock().expect("context lock").get(key)?.clone();
        slot.downcast::<T>().ok()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.set_slot(key, Arc::new(value));
    }

    /// Store an already type-erased value under `key`.
    ///
    /// Used by the node resolver to inject resolved node values without an
    /// extra allocation.
    pub fn set_slot(&self, key: impl Into<String>, value: Slot) {
        self.slots
            .lock()
            .expect("context lock")
            .insert(key.into(), value);
    }

    /// Remove `key`, returning whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.slots.lock().expect("context lock").remove(key).is_some()
    }

    /// Whether `key` is present, regardless of its type.
    pub fn contains(&self, key: &str) -> bool {
        self.slots.lock().expect("context lock").contains_key(key)
    }

    /// Number of stored slots.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("context lock").len()
    }

    /// Whether the context holds no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A detached shallow copy.
    ///
    /// The copy starts with the same slots (values shared via `Arc`) but
    /// further writes on either side are not visible to the other. The
    /// per-event node cache is not carried over.
    pub fn copy(&self) -> Self {
        Self {
            slots: Arc::new(Mutex::new(self.slots.lock().expect("context lock").clone())),
            nodes: NodeCache::default(),
        }
    }

    /// Capture the current slots.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.slots.lock().expect("context lock").clone())
    }

    /// Roll the slots back to a previously captured snapshot.
    pub fn restore(&self, snapshot: Snapshot) {
        *self.slots.lock().expect("context lock") = snapshot.0;
    }

    /// The per-event node session cache attached to this context.
    pub fn node_cache(&self) -> &NodeCache {
        &self.nodes
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock().expect("context lock");
        let mut keys: Vec<&str> = slots.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Context").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip() {
        let ctx = Context::new();
        ctx.set("count", 3i64);
        ctx.set("name", String::from("ferrogram"));

        assert_eq!(*ctx.get::<i64>("count").unwrap(), 3);
        assert_eq!(ctx.get::<String>("name").unwrap().as_str(), "ferrogram");
        // Wrong type is a miss, not a panic.
        assert!(ctx.get::<u8>("count").is_none());
    }

    #[test]
    fn delete_removes_slot() {
        let ctx = Context::new();
        ctx.set("tmp", 1u32);
        assert!(ctx.contains("tmp"));
        assert!(ctx.delete("tmp"));
        assert!(!ctx.contains("tmp"));
        assert!(!ctx.delete("tmp"));
    }

    #[test]
    fn clones_share_slots() {
        let ctx = Context::new();
        let alias = ctx.clone();
        alias.set("shared", 7i32);
        assert_eq!(*ctx.get::<i32>("shared").unwrap(), 7);
    }

    #[test]
    fn copy_is_detached() {
        let ctx = Context::new();
        ctx.set("a", 1i32);
        let copy = ctx.copy();
        copy.set("b", 2i32);
        ctx.set("c", 3i32);

        assert!(copy.contains("a"));
        assert!(!ctx.contains("b"));
        assert!(!copy.contains("c"));
    }

    #[test]
    fn snapshot_restore_discards_writes() {
        let ctx = Context::new();
        ctx.set("keep", 1i32);
        let snap = ctx.snapshot();
        ctx.set("drop", 2i32);
        ctx.set("keep", 9i32);
        ctx.restore(snap);

        assert_eq!(*ctx.get::<i32>("keep").unwrap(), 1);
        assert!(!ctx.contains("drop"));
    }
}
