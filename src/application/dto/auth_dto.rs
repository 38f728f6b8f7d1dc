//! Authentication DTOs.

use crate::domain::entities::AuthToken;

/// Where the token used for a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Token saved by an earlier remember-me login.
    Keyring,
    /// Token passed with `--token` or `CORDSYNC_TOKEN`.
    CommandLine,
    /// Token typed into the login page.
    UserInput,
}

impl TokenSource {
    /// Returns human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Keyring => "system keyring",
            Self::CommandLine => "command line / environment",
            Self::UserInput => "user input",
        }
    }
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Login request data.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub token: String,
    pub source: TokenSource,
    /// Remember-me toggle: save the token in the secret store.
    pub remember: bool,
}

impl LoginRequest {
    #[must_use]
    pub const fn new(token: String, source: TokenSource) -> Self {
        Self {
            token,
            source,
            remember: true,
        }
    }

    /// Disables remember-me.
    #[must_use]
    pub const fn without_remember(mut self) -> Self {
        self.remember = false;
        self
    }
}

/// Accepted login.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub token: AuthToken,
    pub source: TokenSource,
    /// Final state of the remember-me toggle. Reverts to false when the
    /// secret store refused the token.
    pub remembered: bool,
}

impl LoginResponse {
    #[must_use]
    pub const fn new(token: AuthToken, source: TokenSource, remembered: bool) -> Self {
        Self {
            token,
            source,
            remembered,
        }
    }
}
