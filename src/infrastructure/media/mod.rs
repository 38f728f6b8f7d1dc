//! Media blob download and caching.

mod blob_cache;
mod fetcher;

pub use blob_cache::{BlobCache, PendingBlob};
pub use fetcher::{DEFAULT_PROGRESS_INTERVAL, DEFAULT_TIMEOUT, MediaFetcher, sample};
