// WASM localStorage-based storage implementation

use crate::error::CoreError;
use crate::storage_trait::{KeyValueStore, StorageResult};
use log::debug;
use web_sys::window;

/// LocalStorage-based storage backend for WASM mode
pub struct LocalStorageStore {
    prefix: String,
}

impl LocalStorageStore {
    /// Create a new localStorage backend with the specified key prefix
    pub fn new(prefix: String) -> Self {
        Self { prefix }
    }

    /// Get the full key with prefix
    fn get_full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Get localStorage instance
    fn get_storage(&self) -> StorageResult<web_sys::Storage> {
        window()
            .ok_or_else(|| CoreError::Init("No window object available".to_string()))?
            .local_storage()
            .map_err(|e| CoreError::Storage(format!("Failed to access localStorage: {:?}", e)))?
            .ok_or_else(|| CoreError::Init("localStorage not available".to_string()))
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let full_key = self.get_full_key(key);
        debug!("Loading data from localStorage: {}", full_key);

        self.get_storage()?
            .get_item(&full_key)
            .map_err(|e| CoreError::Storage(format!("Failed to read from localStorage: {:?}", e)))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let full_key = self.get_full_key(key);
        debug!("Saving data to localStorage: {}", full_key);

        self.get_storage()?
            .set_item(&full_key, value)
            .map_err(|e| CoreError::Storage(format!("Failed to save to localStorage: {:?}", e)))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let full_key = self.get_full_key(key);
        debug!("Removing from localStorage: {}", full_key);

        self.get_storage()?
            .remove_item(&full_key)
            .map_err(|e| CoreError::Storage(format!("Failed to remove from localStorage: {:?}", e)))
    }
}
