//! Errors raised inside the dispatch loop and by its collaborators.

use thiserror::Error;

/// Fault reported by a bus handler. Logged at the dispatch boundary and
/// never propagated further.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler referenced an entity the cache no longer holds.
    #[error("stale reference to {what}")]
    Stale { what: String },

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Creates a stale-reference error.
    #[must_use]
    pub fn stale(what: impl Into<String>) -> Self {
        Self::Stale { what: what.into() }
    }
}

/// Failure of the persisted key/value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state encoding error: {0}")]
    Encoding(String),
}

/// Failure while fetching a media blob.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("server answered {status}")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid media url: {0}")]
    InvalidUrl(String),
}

/// Failure to hand a notification to the desktop.
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);
