//! Externally visible connection state.

use serde::{Deserialize, Serialize};

/// Close code sent when the account token is rejected.
pub const CLOSE_AUTHENTICATION_FAILED: u16 = 4004;
/// Close code sent when a payload arrives before identification.
pub const CLOSE_NOT_AUTHENTICATED: u16 = 4003;

/// Connection lifecycle as the window presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Shown only after the reconnect grace period expired.
    Reconnecting,
    LoggedOut,
}

impl ConnectionStatus {
    /// Returns true while a session is established or being re-established.
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Connected | Self::Reconnecting)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::LoggedOut => "logged out",
        };
        f.write_str(s)
    }
}

/// What a transport close means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDisposition {
    /// The transport will retry; the session survives.
    Transient,
    /// Authentication failed; the stored token may be reused later.
    LoggedOut,
    /// The token was revoked and must be forgotten.
    Revoked,
}

impl CloseDisposition {
    /// Classifies a close code. `None` means the socket dropped without one.
    #[must_use]
    pub const fn from_code(code: Option<u16>) -> Self {
        match code {
            Some(CLOSE_AUTHENTICATION_FAILED) => Self::Revoked,
            Some(CLOSE_NOT_AUTHENTICATED) => Self::LoggedOut,
            _ => Self::Transient,
        }
    }

    /// Returns true if the session is over.
    #[must_use]
    pub const fn is_logout(self) -> bool {
        !matches!(self, Self::Transient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(None, CloseDisposition::Transient; "no code")]
    #[test_case(Some(1006), CloseDisposition::Transient; "abnormal")]
    #[test_case(Some(4000), CloseDisposition::Transient; "unknown error")]
    #[test_case(Some(4003), CloseDisposition::LoggedOut; "not authenticated")]
    #[test_case(Some(4004), CloseDisposition::Revoked; "authentication failed")]
    fn test_close_classification(code: Option<u16>, expected: CloseDisposition) {
        assert_eq!(CloseDisposition::from_code(code), expected);
    }
}
