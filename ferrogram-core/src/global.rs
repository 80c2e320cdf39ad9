//! # Global context
//!
//! A named, process-wide registry of values shared by every update. Unlike
//! the per-update [`Context`], keys here carry an immutability flag: a key
//! registered as `const` can be set exactly once, and later writes fail
//! with [`ContextError::ImmutableKey`].
//!
//! [`Context`]: crate::Context

use crate::error::ContextError;
use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex},
};

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    is_const: bool,
}

/// Process-wide key-value registry with per-key `const` semantics.
///
/// Cheap to clone; all clones observe the same entries.
#[derive(Clone, Default)]
pub struct GlobalCtx {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl GlobalCtx {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` with an initial value.
    ///
    /// If `is_const` is true the key becomes immutable: any later
    /// [`set`](GlobalCtx::set) (or re-registration) fails.
    pub fn register<T: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: T,
        is_const: bool,
    ) -> Result<(), ContextError> {
        self.insert(key.into(), Arc::new(value), is_const)
    }

    /// Write `key`, keeping it mutable.
    ///
    /// Fails with [`ContextError::ImmutableKey`] if the key was registered
    /// as `const`.
    pub fn set<T: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), ContextError> {
        self.insert(key.into(), Arc::new(value), false)
    }

    fn insert(
        &self,
        key: String,
        value: Arc<dyn Any + Send + Sync>,
        is_const: bool,
    ) -> Result<(), ContextError> {
        let mut entries = self.entries.lock().expect("global context lock");
        if let Some(existing) = entries.get(&key)
            && existing.is_const
        {
            return Err(ContextError::ImmutableKey(key));
        }
        entries.insert(key, Entry { value, is_const });
        Ok(())
    }

    /// Get the value stored under `key`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self
            .entries
            .lock()
            .expect("global context lock")
            .get(key)?
            .value
            .clone();
        value.downcast::<T>().ok()
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .expect("global context lock")
            .contains_key(key)
    }

    /// Whether `key` is registered as `const`.
    pub fn is_const(&self, key: &str) -> bool {
        self.entries
            .lock()
            .expect("global context lock")
            .get(key)
            .is_some_and(|e| e.is_const)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutable_keys_can_be_rewritten() {
        let global = GlobalCtx::new();
        global.register("counter", 1i64, false).unwrap();
        global.set("counter", 2i64).unwrap();
        assert_eq!(*global.get::<i64>("counter").unwrap(), 2);
    }

    #[test]
    fn const_key_rejects_second_write() {
        let global = GlobalCtx::new();
        global.register("owner", 42i64, true).unwrap();

        let err = global.set("owner", 7i64).unwrap_err();
        assert!(matches!(err, ContextError::ImmutableKey(key) if key == "owner"));
        // The originally set value survives.
        assert_eq!(*global.get::<i64>("owner").unwrap(), 42);
    }

    #[test]
    fn const_key_rejects_reregistration() {
        let global = GlobalCtx::new();
        global.register("owner", 42i64, true).unwrap();
        assert!(global.register("owner", 0i64, true).is_err());
        assert!(global.is_const("owner"));
    }
}
