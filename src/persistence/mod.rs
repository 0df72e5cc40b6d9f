//! Key-value persistence
//!
//! Features:
//! - One small trait every backend implements
//! - In-memory store for tests and as a fallback
//! - JSON file store (native) written via tmp → rename
//! - LocalStorage store (web)
//!
//! Callers treat every error as "value unavailable" and keep playing.

use std::collections::BTreeMap;

use thiserror::Error;

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(target_arch = "wasm32")]
mod local_storage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::JsonFileStore;
#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorageStore;

/// Key holding the persisted tutorial flag
pub const TUTORIAL_COMPLETE_KEY: &str = "tutorialComplete";
/// Key holding the local leaderboard JSON
pub const HIGHSCORES_KEY: &str = "reflex_rush_highscores";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Boolean stored as `"true"` / `"false"`; anything else reads as unset
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StoreError> {
        Ok(self.get(key)?.and_then(|v| match v.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }))
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), StoreError> {
        self.set(key, if value { "true" } else { "false" })
    }
}

/// Volatile store; also used when the platform store cannot be opened
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A store that always fails; exercises degraded paths
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("no storage backend".to_string()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("no storage backend".to_string()))
    }
}
