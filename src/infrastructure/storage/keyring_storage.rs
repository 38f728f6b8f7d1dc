//! Remember-me secret in the system keyring.

use std::sync::Arc;

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::domain::entities::AuthToken;
use crate::domain::errors::{AuthError, SecretError};
use crate::domain::ports::TokenStoragePort;

const KEYRING_SERVICE: &str = "cordsync";
const KEYRING_USER: &str = "account";

#[derive(Debug, Clone, Copy)]
enum Op {
    Read,
    Write,
    Delete,
}

fn classify(op: Op, e: keyring::Error) -> AuthError {
    if let keyring::Error::NoStorageAccess(inner) = &e {
        return SecretError::NotAvailable(inner.to_string()).into();
    }
    warn!(?op, error = %e, "keyring operation failed");
    match op {
        Op::Read => AuthError::retrieval_failed(e.to_string()),
        Op::Write => SecretError::StorageFailed(e.to_string()).into(),
        Op::Delete => SecretError::DeletionFailed(e.to_string()).into(),
    }
}

/// Keyring entry holding the account token. Keyring calls block, so they
/// run on the blocking pool.
#[derive(Debug, Clone)]
pub struct KeyringTokenStorage {
    service: Arc<str>,
    user: Arc<str>,
}

impl KeyringTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::with_names(KEYRING_SERVICE, KEYRING_USER)
    }

    #[must_use]
    pub fn with_names(service: &str, user: &str) -> Self {
        Self {
            service: Arc::from(service),
            user: Arc::from(user),
        }
    }

    async fn with_entry<T, F>(&self, op: Op, f: F) -> Result<T, AuthError>
    where
        T: Send + 'static,
        F: FnOnce(&Entry) -> keyring::Result<T> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let user = Arc::clone(&self.user);
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &user)?;
            f(&entry)
        })
        .await
        .map_err(|e| AuthError::from(SecretError::AccessFailed(e.to_string())))?
        .map_err(|e| classify(op, e))
    }
}

impl Default for KeyringTokenStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStoragePort for KeyringTokenStorage {
    async fn get_token(&self) -> Result<Option<AuthToken>, AuthError> {
        let secret = self
            .with_entry(Op::Read, |entry| match entry.get_password() {
                Ok(secret) => Ok(Some(secret)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(e),
            })
            .await?;

        let Some(secret) = secret else {
            debug!(service = %self.service, "no remembered token");
            return Ok(None);
        };
        let token = AuthToken::parse(&secret);
        if token.is_none() {
            warn!("remembered token is malformed, ignoring it");
        }
        Ok(token)
    }

    async fn store_token(&self, token: &AuthToken) -> Result<(), AuthError> {
        let secret = token.expose().to_string();
        self.with_entry(Op::Write, move |entry| entry.set_password(&secret))
            .await?;
        debug!(service = %self.service, "token remembered");
        Ok(())
    }

    async fn delete_token(&self) -> Result<(), AuthError> {
        self.with_entry(Op::Delete, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await?;
        debug!(service = %self.service, "remembered token forgotten");
        Ok(())
    }
}
