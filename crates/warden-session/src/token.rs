//! Opaque 128-bit access tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Opaque session identifier presented by callers.
///
/// Backed by a random (v4) UUID drawn from the OS CSPRNG. The nil UUID is
/// the distinguished empty token and never identifies a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(Uuid);

impl AccessToken {
    /// The empty (all-zero) token.
    pub const EMPTY: AccessToken = AccessToken(Uuid::nil());

    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Whether this is the empty token.
    pub fn is_empty(&self) -> bool {
        self.0.is_nil()
    }

    /// Short, non-identifying prefix for log lines.
    pub fn log_prefix(&self) -> String {
        let s = self.0.simple().to_string();
        format!("{}…", &s[..8])
    }
}

impl Default for AccessToken {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccessToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| Error::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique_and_non_empty() {
        let a = AccessToken::generate();
        let b = AccessToken::generate();
        assert_ne!(a, b);
        assert!(!a.is_empty());
        assert!(!b.is_empty());
    }

    #[test]
    fn test_empty_token() {
        assert!(AccessToken::EMPTY.is_empty());
        assert!(AccessToken::default().is_empty());
        let parsed: AccessToken = "00000000-0000-0000-0000-000000000000".parse().unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_parse_display() {
        let token = AccessToken::generate();
        let parsed: AccessToken = token.to_string().parse().unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "not-a-token".parse::<AccessToken>(),
            Err(Error::InvalidToken)
        ));
        assert!("".parse::<AccessToken>().is_err());
    }

    #[test]
    fn test_log_prefix_does_not_contain_full_token() {
        let token = AccessToken::generate();
        let prefix = token.log_prefix();
        assert!(prefix.chars().count() < 12);
        assert!(!prefix.contains(&token.to_string()));
    }
}
