//! Access token validation.
//!
//! The validator is the only component that turns a presented token into a
//! [`SessionRecord`]. Checks run in a fixed order: token shape first (no
//! I/O), then lookup, then expiry, then one-time consumption.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::SessionCache;
use crate::error::Error;
use crate::record::SessionRecord;
use crate::token::AccessToken;

/// Why a token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedReason {
    /// No token, or the empty token.
    MissingToken,
    /// Unknown, removed, consumed, or expired session.
    SessionNotFoundOrExpired,
}

impl std::fmt::Display for UnauthorizedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingToken => write!(f, "missing access token"),
            Self::SessionNotFoundOrExpired => write!(f, "session not found or expired"),
        }
    }
}

/// Validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(UnauthorizedReason),

    /// The session store failed; the caller may retry.
    #[error("Session storage unavailable")]
    StorageUnavailable(#[source] Error),
}

impl ValidationError {
    /// The unauthorized reason, if this is an authorization failure.
    pub fn reason(&self) -> Option<UnauthorizedReason> {
        match self {
            Self::Unauthorized(reason) => Some(*reason),
            Self::StorageUnavailable(_) => None,
        }
    }

    /// The refusal used for unknown, consumed and expired sessions.
    pub fn not_found() -> Self {
        Self::Unauthorized(UnauthorizedReason::SessionNotFoundOrExpired)
    }
}

impl From<Error> for ValidationError {
    fn from(e: Error) -> Self {
        warn!(error = %e, "Session store failure during validation");
        Self::StorageUnavailable(e)
    }
}

/// Validates presented tokens against a [`SessionCache`].
#[derive(Clone)]
pub struct AccessTokenValidator {
    cache: SessionCache,
}

impl AccessTokenValidator {
    /// Create a validator over the given cache.
    pub fn new(cache: SessionCache) -> Self {
        Self { cache }
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Validate a token and return its session.
    ///
    /// A one-time session is consumed by the first successful validation;
    /// when several validations of the same one-time token race, exactly one
    /// succeeds and the rest fail with
    /// [`UnauthorizedReason::SessionNotFoundOrExpired`].
    pub async fn validate(&self, token: &AccessToken) -> Result<SessionRecord, ValidationError> {
        if token.is_empty() {
            return Err(ValidationError::Unauthorized(
                UnauthorizedReason::MissingToken,
            ));
        }

        let Some(record) = self.cache.get(token).await? else {
            debug!(token = %token.log_prefix(), "No session for token");
            return Err(ValidationError::not_found());
        };

        // The cache already drops expired entries; re-check in case of clock
        // skew between the fill and now.
        if record.is_expired_at(Utc::now()) {
            debug!(token = %token.log_prefix(), "Session expired");
            self.cache.evict(token);
            return Err(ValidationError::not_found());
        }

        if record.one_time {
            // The store's delete is the arbiter: only the caller whose
            // removal actually deleted the row may use the session.
            if !self.cache.remove(token).await? {
                debug!(token = %token.log_prefix(), "One-time session already consumed");
                return Err(ValidationError::not_found());
            }
            debug!(token = %token.log_prefix(), user_id = %record.user_id, "One-time session consumed");
        }

        Ok(record)
    }

    /// Validate an optional token, treating `None` like the empty token.
    pub async fn validate_presented(
        &self,
        token: Option<&AccessToken>,
    ) -> Result<SessionRecord, ValidationError> {
        self.validate(token.unwrap_or(&AccessToken::EMPTY)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use std::time::Duration;

    fn validator() -> AccessTokenValidator {
        AccessTokenValidator::new(SessionCache::in_memory(CacheConfig::new()))
    }

    #[tokio::test]
    async fn test_valid_session() {
        let validator = validator();
        let record = validator
            .cache()
            .create("001", Some(Duration::from_secs(600)), false)
            .await
            .unwrap();

        let validated = validator.validate(&record.token).await.unwrap();
        assert_eq!(validated.user_id, "001");

        // Reusable sessions stay valid.
        assert!(validator.validate(&record.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_token_is_missing() {
        let err = validator().validate(&AccessToken::EMPTY).await.unwrap_err();
        assert_eq!(err.reason(), Some(UnauthorizedReason::MissingToken));

        let err = validator().validate_presented(None).await.unwrap_err();
        assert_eq!(err.reason(), Some(UnauthorizedReason::MissingToken));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let err = validator()
            .validate(&AccessToken::generate())
            .await
            .unwrap_err();
        assert_eq!(
            err.reason(),
            Some(UnauthorizedReason::SessionNotFoundOrExpired)
        );
    }

    #[tokio::test]
    async fn test_one_time_session_consumed() {
        let validator = validator();
        let record = validator.cache().create("001", None, true).await.unwrap();

        assert!(validator.validate(&record.token).await.is_ok());
        let err = validator.validate(&record.token).await.unwrap_err();
        assert_eq!(
            err.reason(),
            Some(UnauthorizedReason::SessionNotFoundOrExpired)
        );
        assert!(validator.cache().store().get(&record.token).await.unwrap().is_none());
    }

    #[test]
    fn test_error_messages_do_not_leak_tokens() {
        let err = ValidationError::not_found();
        assert_eq!(err.to_string(), "Unauthorized: session not found or expired");
    }
}
