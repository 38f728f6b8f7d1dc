use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Persisted navigation keys, stored in `state.toml`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub navigation: BTreeMap<String, String>,
}
