//! Files under the configuration directory.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::app_config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, AppConfig};
use super::state_config::StateConfig;

const CONFIG_FILE_NAME: &str = "config.toml";
const STATE_FILE_NAME: &str = "state.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Owns the configuration directory: `config.toml` (user settings, created
/// with defaults on first run) and `state.toml` (navigation keys).
#[derive(Debug, Clone)]
pub struct StorageManager {
    config_dir: PathBuf,
}

impl StorageManager {
    /// Roots the manager in the platform configuration directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigDirNotFound` if the platform has no
    /// home directory.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or(ConfigError::ConfigDirNotFound)?;

        Ok(Self { config_dir })
    }

    #[must_use]
    pub fn with_dir(path: PathBuf) -> Self {
        Self { config_dir: path }
    }

    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.config_dir.join(STATE_FILE_NAME)
    }

    /// Loads `config.toml`, or `path_override` when given. A missing file
    /// is written out with defaults; a malformed one is left alone and
    /// the defaults are used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or the default
    /// cannot be written.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let path = path_override.map_or_else(|| self.config_dir.join(CONFIG_FILE_NAME), Path::to_path_buf);

        let mut config = match read_document::<AppConfig>(&path)? {
            Some(config) => config,
            None => {
                info!(path = %path.display(), "writing default configuration");
                let config = AppConfig::default();
                write_atomic(&path, &config)?;
                config
            }
        };
        config.config = Some(path);
        Ok(config)
    }

    /// Loads the navigation keys. Missing or malformed state starts empty.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read.
    pub fn load_state(&self) -> Result<StateConfig, ConfigError> {
        Ok(read_document(&self.state_path())?.unwrap_or_default())
    }

    /// Rewrites `state.toml` atomically.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be written.
    pub fn save_state(&self, state: &StateConfig) -> Result<(), ConfigError> {
        write_atomic(&self.state_path(), state)
    }
}

/// Reads a TOML document. `None` if the file does not exist.
fn read_document<T>(path: &Path) -> Result<Option<T>, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match toml::from_str(&content) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed file, using defaults");
            Ok(Some(T::default()))
        }
    }
}

/// Writes `data` next to `path` and renames it into place.
fn write_atomic<T: Serialize>(path: &Path, data: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(data)?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".cordsync.")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), "saved");
    Ok(())
}
