//! Session records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::token::AccessToken;

/// A persisted session.
///
/// Owned by the [`SessionStore`](crate::SessionStore); the
/// [`SessionCache`](crate::SessionCache) only mirrors it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Key under which the session is stored and presented.
    pub token: AccessToken,

    /// User that owns the session.
    pub user_id: String,

    /// When the session was created.
    pub created_at: DateTime<Utc>,

    /// When the session stops being valid.
    pub expires_at: DateTime<Utc>,

    /// Valid for exactly one successful validation.
    pub one_time: bool,
}

impl SessionRecord {
    /// Issue a new record with a fresh token, valid for `expires_in` from now.
    pub fn issue(user_id: impl Into<String>, expires_in: Duration, one_time: bool) -> Result<Self> {
        let created_at = Utc::now();
        let lifetime = chrono::Duration::from_std(expires_in).map_err(|_| Error::InvalidLifetime)?;
        let expires_at = created_at
            .checked_add_signed(lifetime)
            .ok_or(Error::InvalidLifetime)?;
        Self::new(
            AccessToken::generate(),
            user_id,
            created_at,
            expires_at,
            one_time,
        )
    }

    /// Build a record from its parts, enforcing `expires_at > created_at`.
    pub fn new(
        token: AccessToken,
        user_id: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        one_time: bool,
    ) -> Result<Self> {
        if expires_at <= created_at {
            return Err(Error::InvalidLifetime);
        }
        Ok(Self {
            token,
            user_id: user_id.into(),
            created_at,
            expires_at,
            one_time,
        })
    }

    /// Whether the session has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Whether the session has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_sets_lifetime() {
        let record = SessionRecord::issue("001", Duration::from_secs(600), false).unwrap();
        assert_eq!(record.user_id, "001");
        assert!(!record.one_time);
        assert_eq!(
            (record.expires_at - record.created_at).num_seconds(),
            600
        );
        assert!(!record.is_expired());
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        let result = SessionRecord::issue("001", Duration::ZERO, false);
        assert!(matches!(result, Err(Error::InvalidLifetime)));
    }

    #[test]
    fn test_expires_before_created_rejected() {
        let now = Utc::now();
        let result = SessionRecord::new(
            AccessToken::generate(),
            "001",
            now,
            now - chrono::Duration::seconds(1),
            false,
        );
        assert!(matches!(result, Err(Error::InvalidLifetime)));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let record = SessionRecord::new(
            AccessToken::generate(),
            "001",
            now - chrono::Duration::seconds(10),
            now,
            false,
        )
        .unwrap();
        assert!(record.is_expired_at(now));
        assert!(!record.is_expired_at(now - chrono::Duration::seconds(1)));
    }
}
