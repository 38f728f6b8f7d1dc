//! HTTP media fetcher with sampled download progress.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::domain::entities::EmbedKind;
use crate::domain::errors::MediaError;
use crate::domain::ports::{MediaSource, Progress};

use super::blob_cache::BlobCache;

/// Request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default progress sampling period (20 Hz). Shorter periods are raised
/// to it.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// Downloads embeds into a [`BlobCache`].
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    client: reqwest::Client,
    cache: BlobCache,
    progress_interval: Duration,
}

impl MediaFetcher {
    /// Creates a fetcher.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Network` if the HTTP client cannot be built.
    pub fn new(cache: BlobCache, progress_interval: Duration) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| MediaError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            cache,
            progress_interval: progress_interval.max(DEFAULT_PROGRESS_INTERVAL),
        })
    }

    #[must_use]
    pub const fn progress_interval(&self) -> Duration {
        self.progress_interval
    }

    #[must_use]
    pub const fn cache(&self) -> &BlobCache {
        &self.cache
    }
}

/// Progress value for `received` bytes out of an optional total.
#[must_use]
pub fn sample(received: u64, total: Option<u64>) -> Progress {
    match total {
        Some(total) if total > 0 => {
            #[allow(clippy::cast_precision_loss)]
            let fraction = received as f64 / total as f64;
            Progress::Fraction(fraction.min(1.0))
        }
        _ => Progress::Pulse(received),
    }
}

/// Publishes the byte counter on a fixed period until dropped.
struct ProgressTicker(JoinHandle<()>);

impl ProgressTicker {
    fn start(
        period: Duration,
        received: Arc<AtomicU64>,
        total: Option<u64>,
        progress: Arc<watch::Sender<Progress>>,
    ) -> Self {
        Self(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                progress.send_replace(sample(received.load(Ordering::Relaxed), total));
            }
        }))
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn network(e: &reqwest::Error) -> MediaError {
    MediaError::Network(e.to_string())
}

#[async_trait]
impl MediaSource for MediaFetcher {
    async fn fetch(
        &self,
        kind: EmbedKind,
        url: &str,
        progress: watch::Sender<Progress>,
    ) -> Result<PathBuf, MediaError> {
        if let Some(path) = self.cache.lookup(kind, url).await {
            progress.send_replace(Progress::Done);
            return Ok(path);
        }

        let parsed =
            reqwest::Url::parse(url).map_err(|e| MediaError::InvalidUrl(format!("{url}: {e}")))?;

        debug!(?kind, %url, "downloading media");
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| network(&e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "media request rejected");
            return Err(MediaError::Status {
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut blob = self.cache.reserve(kind, url).await?;

        let progress = Arc::new(progress);
        let received = Arc::new(AtomicU64::new(0));
        let ticker = ProgressTicker::start(
            self.progress_interval,
            Arc::clone(&received),
            total,
            Arc::clone(&progress),
        );

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk: Bytes = chunk.map_err(|e| network(&e))?;
            blob.write(&chunk).await?;
            received.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        }
        drop(ticker);
        progress.send_replace(sample(received.load(Ordering::Relaxed), total));

        let path = blob.commit().await?;
        progress.send_replace(Progress::Done);
        Ok(path)
    }
}
