//! Small persisted key/value store.

use crate::domain::errors::StoreError;

/// Key holding the last guild (`0` for the DM pane, absent for none).
pub const LAST_GUILD_KEY: &str = "last-guild-state";
/// Key holding the most recently opened DM.
pub const LAST_DM_KEY: &str = "direct-last-open";

/// Key holding the last channel opened in `guild`.
#[must_use]
pub fn last_channel_key(guild: u64) -> String {
    format!("last-channel-{guild}")
}

/// String-keyed persisted settings. Writes happen on the UI loop and must
/// be cheap.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    /// Sets or, with `None`, removes a key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing file cannot be written.
    fn set(&self, key: &str, value: Option<&str>) -> Result<(), StoreError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// Store that keeps everything in memory and counts writes.
    #[derive(Default)]
    pub struct MemoryStore {
        pub values: RefCell<BTreeMap<String, String>>,
        pub writes: RefCell<Vec<(String, Option<String>)>>,
    }

    impl MemoryStore {
        pub fn with(entries: &[(&str, &str)]) -> Self {
            let store = Self::default();
            for (k, v) in entries {
                store.values.borrow_mut().insert((*k).to_string(), (*v).to_string());
            }
            store
        }
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Option<String> {
            self.values.borrow().get(key).cloned()
        }

        fn set(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
            self.writes
                .borrow_mut()
                .push((key.to_string(), value.map(str::to_string)));
            match value {
                Some(v) => self.values.borrow_mut().insert(key.to_string(), v.to_string()),
                None => self.values.borrow_mut().remove(key),
            };
            Ok(())
        }
    }
}
