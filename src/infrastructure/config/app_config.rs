//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::args::CliArgs;
use crate::application::services::{NotificationSettings, SwitcherLimits};

pub(super) const APP_NAME: &str = "cordsync";
pub(super) const APP_QUALIFIER: &str = "com";
pub(super) const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, as read from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Save the token in the system keyring after a login.
    #[serde(default = "default_true")]
    pub remember_token: bool,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub quick_switcher: QuickSwitcherConfig,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Enable mention notifications.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Stay silent while the local status is do-not-disturb.
    #[serde(default = "default_true")]
    pub suppress_in_dnd: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            suppress_in_dnd: true,
        }
    }
}

/// Media blob cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Cache root; one subdirectory per media kind.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Download progress sampling rate.
    #[serde(default = "default_progress_hz")]
    pub progress_hz: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            progress_hz: default_progress_hz(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Seconds a dropped connection stays hidden before the reconnect page.
    #[serde(default = "default_reconnect_grace_secs")]
    pub reconnect_grace_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: default_reconnect_grace_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickSwitcherConfig {
    #[serde(default = "default_channel_limit")]
    pub channel_limit: usize,

    #[serde(default = "default_guild_limit")]
    pub guild_limit: usize,
}

impl Default for QuickSwitcherConfig {
    fn default() -> Self {
        Self {
            channel_limit: default_channel_limit(),
            guild_limit: default_guild_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Progress is never sampled faster than this.
pub const MAX_PROGRESS_HZ: u32 = 20;

fn default_progress_hz() -> u32 {
    MAX_PROGRESS_HZ
}

fn default_reconnect_grace_secs() -> u64 {
    3
}

fn default_channel_limit() -> usize {
    SwitcherLimits::default().channels
}

fn default_guild_limit() -> usize {
    SwitcherLimits::default().guilds
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(notifications) = args.notifications {
            self.notifications.enabled = notifications;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.media.cache_dir = Some(cache_dir.clone());
        }
        if args.no_remember {
            self.remember_token = false;
        }
    }

    #[must_use]
    pub fn notification_settings(&self) -> NotificationSettings {
        NotificationSettings {
            enabled: self.notifications.enabled,
            suppress_in_dnd: self.notifications.suppress_in_dnd,
        }
    }

    #[must_use]
    pub fn switcher_limits(&self) -> SwitcherLimits {
        SwitcherLimits {
            channels: self.quick_switcher.channel_limit,
            guilds: self.quick_switcher.guild_limit,
        }
    }

    #[must_use]
    pub const fn reconnect_grace(&self) -> Duration {
        Duration::from_secs(self.connection.reconnect_grace_secs)
    }

    /// Progress sampling period. A zero rate falls back to the default and
    /// faster rates are capped at [`MAX_PROGRESS_HZ`].
    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        let hz = match self.media.progress_hz {
            0 => default_progress_hz(),
            hz => hz.min(MAX_PROGRESS_HZ),
        };
        Duration::from_secs(1) / hz
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().join("cordsync.log"))
    }

    /// Returns default media cache root.
    #[must_use]
    pub fn default_cache_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    /// Returns effective media cache root.
    #[must_use]
    pub fn effective_cache_dir(&self) -> Option<PathBuf> {
        self.media.cache_dir.clone().or_else(Self::default_cache_dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            remember_token: true,
            notifications: NotificationsConfig::default(),
            media: MediaConfig::default(),
            connection: ConnectionConfig::default(),
            quick_switcher: QuickSwitcherConfig::default(),
        }
    }
}
