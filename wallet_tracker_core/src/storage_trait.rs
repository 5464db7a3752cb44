// Storage abstraction - allows both file-based (native) and localStorage (WASM)

use crate::error::CoreError;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, CoreError>;

/// Abstract key-value store.
///
/// Operations are synchronous: callers rely on a successful `set` meaning the
/// value is durable before they return control.
pub trait KeyValueStore {
    /// Load the raw value stored under `key`
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// Standard storage keys used across the application
pub mod keys {
    pub const TRACKING_ENABLED: &str = "tracking_enabled";
}

/// In-process store. Clones share the same map, so a test (or a restarted
/// component) can observe what another handle wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!("Saving key to memory store: {}", key);
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_shared_between_clones() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set(keys::TRACKING_ENABLED, "false").unwrap();
        assert_eq!(
            other.get(keys::TRACKING_ENABLED).unwrap().as_deref(),
            Some("false")
        );

        other.remove(keys::TRACKING_ENABLED).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.get(keys::TRACKING_ENABLED).unwrap(), None);
    }

    #[test]
    fn test_boxed_store_forwards() {
        let inner = MemoryStore::new();
        let boxed: Box<dyn KeyValueStore> = Box::new(inner.clone());
        boxed.set("k", "v").unwrap();
        assert_eq!(inner.len(), 1);
        assert_eq!(boxed.get("k").unwrap().as_deref(), Some("v"));
    }
}
