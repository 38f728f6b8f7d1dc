//! Navigation keys persisted in `state.toml`.

use std::cell::RefCell;

use color_eyre::eyre::{Result, WrapErr};
use tracing::{debug, warn};

use super::config::{ConfigError, StateConfig, StorageManager};
use crate::domain::errors::StoreError;
use crate::domain::ports::KeyValueStore;

/// Key/value store backed by `state.toml`. Every write rewrites the file
/// atomically; with no storage the values live in memory only.
pub struct StateStore {
    storage: Option<StorageManager>,
    state: RefCell<StateConfig>,
}

impl StateStore {
    /// Loads the persisted state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file exists but cannot be read.
    pub fn load(storage: StorageManager) -> Result<Self> {
        let state = storage
            .load_state()
            .wrap_err("Failed to load navigation state")?;
        debug!(keys = state.navigation.len(), "navigation state loaded");
        Ok(Self {
            storage: Some(storage),
            state: RefCell::new(state),
        })
    }

    /// Store that never touches the disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            storage: None,
            state: RefCell::new(StateConfig::default()),
        }
    }
}

impl KeyValueStore for StateStore {
    fn get(&self, key: &str) -> Option<String> {
        self.state.borrow().navigation.get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        let snapshot = {
            let mut state = self.state.borrow_mut();
            let previous = match value {
                Some(v) => state.navigation.insert(key.to_string(), v.to_string()),
                None => state.navigation.remove(key),
            };
            if previous.as_deref() == value {
                return Ok(());
            }
            state.clone()
        };

        let Some(storage) = &self.storage else {
            return Ok(());
        };
        storage.save_state(&snapshot).map_err(|e| {
            warn!(key, error = %e, "failed to persist navigation state");
            match e {
                ConfigError::Io(io) => StoreError::Io(io),
                other => StoreError::Encoding(other.to_string()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reload() {
        let dir = tempdir().unwrap();
        let store = StateStore::load(StorageManager::with_dir(dir.path().to_path_buf())).unwrap();

        store.set("last-guild-state", Some("100")).unwrap();
        store.set("direct-last-open", Some("7")).unwrap();
        store.set("direct-last-open", None).unwrap();

        let reloaded =
            StateStore::load(StorageManager::with_dir(dir.path().to_path_buf())).unwrap();
        assert_eq!(reloaded.get("last-guild-state").as_deref(), Some("100"));
        assert_eq!(reloaded.get("direct-last-open"), None);
    }

    #[test]
    fn test_in_memory_store() {
        let store = StateStore::in_memory();
        store.set("last-channel-1", Some("2")).unwrap();
        assert_eq!(store.get("last-channel-1").as_deref(), Some("2"));
    }
}
