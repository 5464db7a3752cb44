// Native file-based storage implementation

use crate::error::CoreError;
use crate::storage_trait::{KeyValueStore, StorageResult};
use log::debug;
use std::path::PathBuf;

/// File-based storage backend for native (CLI) mode. Each key is stored as
/// `<base_dir>/<key>.json`.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new file storage backend with the specified base directory
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the full path for a storage key
    fn get_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.get_path(key);
        debug!("Loading data from file: {:?}", path);

        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("File does not exist: {:?}", path);
                Ok(None)
            }
            Err(e) => Err(CoreError::Io(format!("Failed to read file: {}", e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.get_path(key);
        debug!("Saving data to file: {:?}", path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::Io(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(&path, value)
            .map_err(|e| CoreError::Io(format!("Failed to write file: {}", e)))?;

        debug!("Data saved successfully to {:?}", path);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.get_path(key);
        debug!("Removing file: {:?}", path);

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("File does not exist, nothing to remove: {:?}", path);
                Ok(())
            }
            Err(e) => Err(CoreError::Io(format!("Failed to remove file: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ConsentGatedDispatcher;
    use crate::storage_trait::keys;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStore::new(temp_dir.path().join("nested"));

        assert_eq!(storage.get("test_key").unwrap(), None);
        storage.set("test_key", "true").unwrap();
        assert_eq!(storage.get("test_key").unwrap().as_deref(), Some("true"));
        assert!(temp_dir.path().join("nested").join("test_key.json").exists());
    }

    #[test]
    fn test_file_storage_remove() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStore::new(temp_dir.path().to_path_buf());

        storage.set("test_key", "1").unwrap();
        storage.remove("test_key").unwrap();
        assert_eq!(storage.get("test_key").unwrap(), None);

        // Removing again is fine
        storage.remove("test_key").unwrap();
    }

    #[test]
    fn test_consent_persists_across_restart() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileStore::new(temp_dir.path().to_path_buf());
            let mut dispatcher = ConsentGatedDispatcher::new(None, Box::new(store), true);
            dispatcher.set_consent(false);
        }

        let store = FileStore::new(temp_dir.path().to_path_buf());
        assert_eq!(store.get(keys::TRACKING_ENABLED).unwrap().as_deref(), Some("false"));
        let dispatcher = ConsentGatedDispatcher::new(None, Box::new(store), true);
        assert!(!dispatcher.current_consent());
    }
}
