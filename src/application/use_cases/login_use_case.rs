//! Login use case implementation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::dto::{LoginRequest, LoginResponse, TokenSource};
use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;
use crate::domain::ports::TokenStoragePort;

/// Accepts a token for the session and applies the remember-me toggle.
///
/// The token is not checked against the server here; a rejected token
/// surfaces later as an authentication close on the transport.
#[derive(Clone)]
pub struct LoginUseCase {
    storage_port: Arc<dyn TokenStoragePort>,
}

impl LoginUseCase {
    /// Creates new login use case.
    #[must_use]
    pub const fn new(storage_port: Arc<dyn TokenStoragePort>) -> Self {
        Self { storage_port }
    }

    /// Executes login with provided request.
    ///
    /// A secret store failure does not fail the login: the session goes on
    /// with the token in memory and `remembered` comes back false.
    ///
    /// # Errors
    /// Returns error if the token is malformed.
    pub async fn execute(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        debug!(source = %request.source, "Attempting login");

        let token = AuthToken::parse(&request.token).ok_or_else(|| {
            warn!("Invalid token format provided");
            AuthError::invalid_format("token does not match the account token shape")
        })?;

        let remembered = if request.remember && request.source != TokenSource::Keyring {
            match self.storage_port.store_token(&token).await {
                Ok(()) => {
                    info!("Token persisted to secure storage");
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Failed to persist token, remember-me turned off");
                    false
                }
            }
        } else {
            request.remember
        };

        info!(token = %token, source = %request.source, remembered, "Login accepted");
        Ok(LoginResponse::new(token, request.source, remembered))
    }

    /// Deletes the stored token.
    ///
    /// # Errors
    /// Returns error if deletion fails.
    pub async fn forget(&self) -> Result<(), AuthError> {
        debug!("Deleting token from secure storage");
        match self.storage_port.delete_token().await {
            Ok(()) => {
                info!("Token deleted from secure storage");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to delete token from secure storage");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::MockTokenStorage;

    fn make_valid_token() -> String {
        "MTIzNDU2Nzg5MDEyMzQ1Njc4OQ.XXXXXX.YYYYYYYYYYYYYYYYYYYYYYYYYYYY".to_string()
    }

    #[tokio::test]
    async fn test_successful_login_remembers() {
        let storage_port = MockTokenStorage::new();
        let use_case = LoginUseCase::new(Arc::new(storage_port.clone()));
        let request = LoginRequest::new(make_valid_token(), TokenSource::UserInput);

        let response = use_case.execute(request).await.unwrap();

        assert!(response.remembered);
        assert_eq!(response.token.expose(), make_valid_token());
        assert!(storage_port.current().is_some());
    }

    #[tokio::test]
    async fn test_invalid_token_format() {
        let use_case = LoginUseCase::new(Arc::new(MockTokenStorage::new()));
        let request = LoginRequest::new("invalid".to_string(), TokenSource::UserInput);

        let result = use_case.execute(request).await;

        assert!(matches!(result, Err(AuthError::InvalidTokenFormat { .. })));
    }

    #[tokio::test]
    async fn test_store_failure_turns_remember_off() {
        let use_case = LoginUseCase::new(Arc::new(MockTokenStorage::failing()));
        let request = LoginRequest::new(make_valid_token(), TokenSource::UserInput);

        let response = use_case.execute(request).await.unwrap();

        assert!(!response.remembered);
    }

    #[tokio::test]
    async fn test_login_without_remember() {
        let storage_port = MockTokenStorage::new();
        let use_case = LoginUseCase::new(Arc::new(storage_port.clone()));
        let request =
            LoginRequest::new(make_valid_token(), TokenSource::CommandLine).without_remember();

        let response = use_case.execute(request).await.unwrap();

        assert!(!response.remembered);
        assert!(storage_port.current().is_none());
    }

    #[tokio::test]
    async fn test_forget_deletes() {
        let storage_port =
            MockTokenStorage::with_token(AuthToken::new_unchecked(make_valid_token()));
        let use_case = LoginUseCase::new(Arc::new(storage_port.clone()));

        use_case.forget().await.unwrap();

        assert!(storage_port.current().is_none());
    }
}
