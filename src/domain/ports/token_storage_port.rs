//! Where the remembered account token lives between runs.

use async_trait::async_trait;

use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;

/// The `account` secret. At most one token is remembered at a time.
#[async_trait]
pub trait TokenStoragePort: Send + Sync {
    /// `Ok(None)` when nothing usable is remembered.
    async fn get_token(&self) -> Result<Option<AuthToken>, AuthError>;

    /// Replaces whatever was remembered before.
    async fn store_token(&self, token: &AuthToken) -> Result<(), AuthError>;

    /// Forgetting an absent token is not an error.
    async fn delete_token(&self) -> Result<(), AuthError>;
}

#[cfg(test)]
pub mod mock {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::domain::errors::SecretError;

    #[derive(Debug, Default)]
    struct Vault {
        token: Option<AuthToken>,
        writes: usize,
        deletes: usize,
    }

    /// Secret store kept in memory. `failing()` refuses every write.
    #[derive(Debug, Clone, Default)]
    pub struct MockTokenStorage {
        vault: Arc<Mutex<Vault>>,
        read_only: bool,
    }

    impl MockTokenStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_token(token: AuthToken) -> Self {
            let storage = Self::default();
            storage.vault.lock().unwrap().token = Some(token);
            storage
        }

        pub fn failing() -> Self {
            Self {
                read_only: true,
                ..Self::default()
            }
        }

        pub fn current(&self) -> Option<AuthToken> {
            self.vault.lock().unwrap().token.clone()
        }

        pub fn writes(&self) -> usize {
            self.vault.lock().unwrap().writes
        }

        pub fn deletes(&self) -> usize {
            self.vault.lock().unwrap().deletes
        }
    }

    #[async_trait]
    impl TokenStoragePort for MockTokenStorage {
        async fn get_token(&self) -> Result<Option<AuthToken>, AuthError> {
            Ok(self.current())
        }

        async fn store_token(&self, token: &AuthToken) -> Result<(), AuthError> {
            if self.read_only {
                return Err(SecretError::NotAvailable("locked".into()).into());
            }
            let mut vault = self.vault.lock().unwrap();
            vault.token = Some(token.clone());
            vault.writes += 1;
            Ok(())
        }

        async fn delete_token(&self) -> Result<(), AuthError> {
            let mut vault = self.vault.lock().unwrap();
            vault.token = None;
            vault.deletes += 1;
            Ok(())
        }
    }
}
