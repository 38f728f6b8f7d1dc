//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Media blob download and cache.
pub mod media;
/// System notifications.
pub mod notifications;
/// Event replay transport.
pub mod replay;
pub mod search;
/// Persisted navigation keys.
pub mod state_store;
/// Token storage adapters.
pub mod storage;

pub use config::{AppConfig, CliArgs, Command, LogLevel, StorageManager};
pub use media::{BlobCache, MediaFetcher};
pub use notifications::{ClickSender, DesktopNotifier};
pub use replay::{ReplayError, ReplayGateway};
pub use search::FuzzySearcher;
pub use state_store::StateStore;
pub use storage::KeyringTokenStorage;
