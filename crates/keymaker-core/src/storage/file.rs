//! File-based storage implementation for native platforms.

use super::{KeyValueStore, StoreError, StoreResult};
use std::fs;
use std::path::{Path, PathBuf};

/// File-based storage for native platforms.
///
/// Stores each key as a JSON string in its own file under a directory.
#[derive(Debug)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StoreResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StoreError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/keymaker/state/`
    /// On Windows: `%LOCALAPPDATA%\keymaker\state\`
    pub fn default_location() -> StoreResult<Self> {
        let base = dirs::data_local_dir().or_else(dirs::home_dir).ok_or_else(|| {
            StoreError::Unavailable("Could not determine home directory".to_string())
        })?;

        Self::new(base.join("keymaker").join("state"))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_key))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| StoreError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let value: String = serde_json::from_str(&json).map_err(|e| {
            StoreError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.key_path(key);
        let json = serde_json::to_string(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| StoreError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StoreError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf()).unwrap();

        store.set("keymaker_unlocked", "true").unwrap();
        assert_eq!(store.get("keymaker_unlocked").unwrap().as_deref(), Some("true"));
        assert!(temp_dir.path().join("keymaker_unlocked.json").exists());
    }

    #[test]
    fn test_values_survive_a_new_store() {
        let temp_dir = TempDir::new().unwrap();
        FileStore::new(temp_dir.path().to_path_buf())
            .unwrap()
            .set("flag", "true")
            .unwrap();

        let reopened = FileStore::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.get("flag").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_missing_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf()).unwrap();

        assert_eq!(store.get("missing").unwrap(), None);
        store.set("flag", "true").unwrap();
        store.remove("flag").unwrap();
        store.remove("flag").unwrap();
        assert_eq!(store.get("flag").unwrap(), None);
    }

    #[test]
    fn test_key_sanitization() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf()).unwrap();

        store.set("../escape/key", "x").unwrap();
        assert!(temp_dir.path().join("___escape_key.json").exists());
        assert_eq!(store.get("../escape/key").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf()).unwrap();
        fs::write(temp_dir.path().join("flag.json"), "{ not json").unwrap();

        assert!(matches!(store.get("flag"), Err(StoreError::Serialization(_))));
    }

    #[test]
    fn test_creates_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        let store = FileStore::new(nested.clone()).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.base_path(), nested.as_path());
    }
}
