//! Account token value object.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Opaque account token. The secret is wiped from memory on drop and never
/// printed in full.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AuthToken {
    value: String,
}

impl AuthToken {
    const MIN_LEN: usize = 50;

    /// Parses a token, rejecting values that cannot be account tokens.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.len() < Self::MIN_LEN || value.split('.').count() != 3 {
            return None;
        }
        Some(Self {
            value: value.to_string(),
        })
    }

    /// Wraps a token without validation.
    #[must_use]
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Returns the secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Returns a masked form safe for logs.
    #[must_use]
    pub fn masked(&self) -> String {
        let len = self.value.chars().count();
        if len <= 10 {
            return "*".repeat(len);
        }
        let head: String = self.value.chars().take(4).collect();
        let tail: String = self.value.chars().skip(len - 4).collect();
        format!("{head}...{tail}")
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthToken").field(&self.masked()).finish()
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "MTIzNDU2Nzg5MDEyMzQ1Njc4OQ.XXXXXX.YYYYYYYYYYYYYYYYYYYYYYYYYYYY";

    #[test]
    fn test_parse_validates_shape() {
        assert!(AuthToken::parse(RAW).is_some());
        assert!(AuthToken::parse(&format!("  {RAW}\n")).is_some());
        assert!(AuthToken::parse("short").is_none());
        assert!(AuthToken::parse(&"a".repeat(60)).is_none());
    }

    #[test]
    fn test_formatting_never_leaks() {
        let token = AuthToken::new_unchecked(RAW);
        assert!(!format!("{token:?}").contains(RAW));
        assert!(!token.to_string().contains(RAW));
        assert_eq!(token.masked(), "MTIz...YYYY");
        assert_eq!(token.expose(), RAW);
    }
}
