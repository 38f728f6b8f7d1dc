//! Picks the token a session starts with.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::dto::TokenSource;
use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;
use crate::domain::ports::TokenStoragePort;

/// Token together with where it was found.
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    pub token: AuthToken,
    pub source: TokenSource,
}

impl ResolvedToken {
    #[must_use]
    pub const fn new(token: AuthToken, source: TokenSource) -> Self {
        Self { token, source }
    }
}

/// Looks for a usable token: a remembered one first, then the one given on
/// the command line or in the environment.
pub struct ResolveTokenUseCase {
    storage_port: Arc<dyn TokenStoragePort>,
}

impl ResolveTokenUseCase {
    #[must_use]
    pub const fn new(storage_port: Arc<dyn TokenStoragePort>) -> Self {
        Self { storage_port }
    }

    /// Returns `None` when neither source has a well-formed token; the
    /// caller then shows the login page.
    ///
    /// # Errors
    ///
    /// Never fails today: an unreachable secret store is logged and treated
    /// as empty so a command-line token can still be used.
    pub async fn execute(&self, cli_token: Option<String>) -> Result<Option<ResolvedToken>, AuthError> {
        if let Some(token) = self.remembered().await {
            info!(token = %token.masked(), "using remembered token");
            return Ok(Some(ResolvedToken::new(token, TokenSource::Keyring)));
        }

        let resolved = cli_token.as_deref().and_then(parse_cli_token).map(|token| {
            info!(token = %token.masked(), "using command-line token");
            ResolvedToken::new(token, TokenSource::CommandLine)
        });
        if resolved.is_none() {
            debug!("no token available");
        }
        Ok(resolved)
    }

    async fn remembered(&self) -> Option<AuthToken> {
        match self.storage_port.get_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "secret store unavailable");
                None
            }
        }
    }
}

fn parse_cli_token(raw: &str) -> Option<AuthToken> {
    if raw.trim().is_empty() {
        return None;
    }
    let token = AuthToken::parse(raw);
    if token.is_none() {
        warn!("command-line token is malformed, ignoring it");
    }
    token
}
