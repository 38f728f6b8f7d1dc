//! Failures of the platform secret store.

use thiserror::Error;

/// What went wrong while touching the `account` secret.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The store answered but the entry could not be opened or read.
    #[error("secret store access failed: {0}")]
    AccessFailed(String),

    #[error("could not save the account secret: {0}")]
    StorageFailed(String),

    #[error("could not remove the account secret: {0}")]
    DeletionFailed(String),

    /// No store on this machine, or it is locked.
    #[error("no secret store available: {0}")]
    NotAvailable(String),
}

impl SecretError {
    /// A later attempt may succeed without the user doing anything.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::AccessFailed(_))
    }
}
