//! Durable "journey completed" flag.

use crate::storage::{KeyValueStore, StoreResult};
use std::sync::Arc;

/// Storage key of the completion flag.
pub const COMPLETION_KEY: &str = "keymaker_unlocked";

const COMPLETED_VALUE: &str = "true";

/// Remembers across sessions that the journey was completed.
///
/// Storage problems never surface to callers: an unreadable store reads as
/// not completed, and failed writes are logged and dropped.
#[derive(Clone)]
pub struct CompletionFlag {
    store: Option<Arc<dyn KeyValueStore>>,
}

impl CompletionFlag {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A flag with no durable store. Always unset; writes are dropped.
    pub fn detached() -> Self {
        Self { store: None }
    }

    /// A flag over the platform's default store, or detached if it cannot
    /// be opened.
    pub fn platform() -> Self {
        match crate::storage::create_default_store() {
            Ok(store) => Self::new(store),
            Err(e) => {
                log::warn!("Completion flag has no durable store: {}", e);
                Self::detached()
            }
        }
    }

    pub fn is_durable(&self) -> bool {
        self.store.is_some()
    }

    /// Whether the journey has been completed.
    pub fn is_set(&self) -> bool {
        match self.read() {
            Ok(value) => value.as_deref() == Some(COMPLETED_VALUE),
            Err(e) => {
                log::warn!("Failed to read completion flag: {}", e);
                false
            }
        }
    }

    /// Mark the journey as completed.
    pub fn set(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.set(COMPLETION_KEY, COMPLETED_VALUE) {
                log::warn!("Failed to write completion flag: {}", e);
            }
        }
    }

    /// Forget the completion.
    pub fn clear(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.remove(COMPLETION_KEY) {
                log::warn!("Failed to clear completion flag: {}", e);
            }
        }
    }

    /// Mark the journey as completed. Returns `true` only if it was not
    /// completed before this call.
    pub fn complete(&self) -> bool {
        if self.is_set() {
            return false;
        }
        self.set();
        log::info!("journey completed");
        true
    }

    fn read(&self) -> StoreResult<Option<String>> {
        match &self.store {
            Some(store) => store.get(COMPLETION_KEY),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for CompletionFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionFlag")
            .field("durable", &self.is_durable())
            .finish()
    }
}
