//! Key-value persistence for small flags that must survive reloads.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod local;

pub use memory::MemoryStore;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

#[cfg(target_arch = "wasm32")]
pub use local::LocalStorageStore;

use std::sync::Arc;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// String key-value storage.
///
/// Implementations can keep values in memory, in browser local storage, or
/// on the filesystem. Reads of a missing key return `Ok(None)`.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// String key-value storage (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait KeyValueStore {
    /// Read the value under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Platform-specific store type.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformStore = FileStore;

/// Platform-specific store type.
#[cfg(target_arch = "wasm32")]
pub type PlatformStore = LocalStorageStore;

/// Create the default store for the current platform.
///
/// On native this is a [`FileStore`] under the user's data directory; on
/// WASM it is the page's local storage.
pub fn create_default_store() -> StoreResult<Arc<PlatformStore>> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        FileStore::default_location().map(Arc::new)
    }

    #[cfg(target_arch = "wasm32")]
    {
        LocalStorageStore::new().map(Arc::new)
    }
}
