//! Media blob fetching port.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::entities::EmbedKind;
use crate::domain::errors::MediaError;

/// Download progress as sampled by the progress timer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Progress {
    #[default]
    Pending,
    /// Fraction of a known length, in `0.0..=1.0`.
    Fraction(f64),
    /// Length unknown; carries the bytes received so far.
    Pulse(u64),
    Done,
}

/// Fetches a blob into the local cache and returns its path.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Downloads `url`, or returns the cached copy.
    ///
    /// # Errors
    ///
    /// Returns `MediaError` on non-2xx answers, network faults and cache
    /// write failures.
    async fn fetch(
        &self,
        kind: EmbedKind,
        url: &str,
        progress: watch::Sender<Progress>,
    ) -> Result<PathBuf, MediaError>;
}
