//! Browser local storage implementation for WebAssembly.

use super::{KeyValueStore, StoreError, StoreResult};

/// Store backed by `window.localStorage`.
///
/// Note: Not Send/Sync since WASM is single-threaded and the storage handle
/// is a JS object.
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

impl LocalStorageStore {
    /// Open the page's local storage.
    ///
    /// Fails when there is no window or the browser refuses access (private
    /// browsing modes, disabled cookies).
    pub fn new() -> StoreResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| StoreError::Unavailable("No window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StoreError::Unavailable(format!("localStorage error: {:?}", e)))?
            .ok_or_else(|| StoreError::Unavailable("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| StoreError::Other(format!("Failed to read {}: {:?}", key, e)))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StoreError::Other(format!("Failed to write {}: {:?}", key, e)))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| StoreError::Other(format!("Failed to delete {}: {:?}", key, e)))
    }
}
