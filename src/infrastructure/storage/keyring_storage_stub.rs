//! Secret store used when the crate is built without `keyring`.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::entities::AuthToken;
use crate::domain::errors::{AuthError, SecretError};
use crate::domain::ports::TokenStoragePort;

const REASON: &str = "cordsync was built without keyring support";

/// Remembers nothing. Saving fails, so a login request with remember-me
/// comes back with the flag turned off.
#[derive(Debug, Clone, Default)]
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TokenStoragePort for KeyringTokenStorage {
    async fn get_token(&self) -> Result<Option<AuthToken>, AuthError> {
        debug!(reason = REASON, "no remembered token");
        Ok(None)
    }

    async fn store_token(&self, _token: &AuthToken) -> Result<(), AuthError> {
        Err(SecretError::NotAvailable(REASON.to_string()).into())
    }

    async fn delete_token(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
