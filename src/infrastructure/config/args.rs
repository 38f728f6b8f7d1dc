use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use super::app_config::LogLevel;
use crate::domain::entities::EmbedKind;

#[derive(Debug, Parser)]
#[command(
    name = "cordsync",
    version,
    about = "State synchronization core for a desktop Discord client",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Account token.
    #[arg(long, env = "CORDSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Do not save the token in the system keyring.
    #[arg(long)]
    pub no_remember: bool,

    /// Enable mention notifications.
    #[arg(long)]
    pub notifications: Option<bool>,

    /// Media cache root.
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Drive the core from a JSON-lines file of decoded gateway events.
    Replay {
        /// Event file, one `{"t": ..., "d": ...}` object per line.
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Run the quick switcher against the final cache.
        #[arg(long, value_name = "QUERY")]
        switch: Option<String>,

        /// Delay between events, in milliseconds.
        #[arg(long, default_value_t = 0)]
        pace_ms: u64,

        /// Also show mention notifications on the desktop.
        #[arg(long)]
        desktop: bool,
    },

    /// Download one media blob into the cache, reporting progress.
    Fetch {
        #[arg(value_name = "URL")]
        url: String,

        #[arg(long, value_enum, default_value_t = MediaKind::Image)]
        kind: MediaKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediaKind {
    Image,
    Gif,
    Gifv,
    Video,
    Audio,
}

impl From<MediaKind> for EmbedKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Self::Image,
            MediaKind::Gif => Self::Gif,
            MediaKind::Gifv => Self::Gifv,
            MediaKind::Video => Self::Video,
            MediaKind::Audio => Self::Audio,
        }
    }
}
