//! Why a session could not get or keep its account token.

use thiserror::Error;

use super::SecretError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed token: {reason}")]
    InvalidTokenFormat { reason: String },

    /// The gateway closed with an authentication code.
    #[error("server rejected the token (close code {code})")]
    TokenRejected { code: u16 },

    #[error("could not read the remembered token: {message}")]
    TokenRetrievalFailed { message: String },

    #[error("could not remember the token: {message}")]
    TokenStorageFailed { message: String },

    #[error("no token to log in with")]
    NoTokenAvailable,

    #[error("transport failure: {message}")]
    NetworkError { message: String },

    #[error(transparent)]
    Secret(#[from] SecretError),
}

impl AuthError {
    #[must_use]
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidTokenFormat {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn retrieval_failed(message: impl Into<String>) -> Self {
        Self::TokenRetrievalFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn storage_failed(message: impl Into<String>) -> Self {
        Self::TokenStorageFailed {
            message: message.into(),
        }
    }

    /// The same token may be tried again.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::NetworkError { .. } | Self::NoTokenAvailable => true,
            Self::Secret(e) => e.is_transient(),
            _ => false,
        }
    }

    /// The failure is local to the secret store, not the server.
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::TokenRetrievalFailed { .. } | Self::TokenStorageFailed { .. } | Self::Secret(_)
        )
    }
}
