//! Durable session storage.
//!
//! This module defines the [`SessionStore`] trait that decouples the session
//! cache from a specific storage backend, plus an in-process
//! [`MemorySessionStore`]. The SQLite backend lives in [`crate::sqlite`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::Result;
use crate::record::SessionRecord;
use crate::token::AccessToken;

/// Trait for durable session backends.
///
/// The cache calls these methods on misses and forwards every write, so the
/// store remains the owner of session state. Implementations must report
/// backend failures as [`Error::Unavailable`](crate::Error::Unavailable),
/// never as an absent session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session by token. `Ok(None)` means no such session.
    async fn get(&self, token: &AccessToken) -> Result<Option<SessionRecord>>;

    /// Create and persist a session with a fresh token.
    async fn create(
        &self,
        user_id: &str,
        expires_in: Duration,
        one_time: bool,
    ) -> Result<SessionRecord> {
        let record = SessionRecord::issue(user_id, expires_in, one_time)?;
        self.insert(&record).await?;
        Ok(record)
    }

    /// Persist a fully-formed record, replacing any record with the same token.
    async fn insert(&self, record: &SessionRecord) -> Result<()>;

    /// Delete a session.
    ///
    /// Returns `true` only for the call that actually removed the record;
    /// concurrent removals of the same token see exactly one `true`.
    async fn remove(&self, token: &AccessToken) -> Result<bool>;

    /// Delete every session that expired at or before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Process-local session store.
///
/// Useful for tests and single-process deployments where sessions need not
/// survive a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<AccessToken, SessionRecord>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, token: &AccessToken) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.lock().get(token).cloned())
    }

    async fn insert(&self, record: &SessionRecord) -> Result<()> {
        self.sessions.lock().insert(record.token, record.clone());
        Ok(())
    }

    async fn remove(&self, token: &AccessToken) -> Result<bool> {
        Ok(self.sessions.lock().remove(token).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired_at(now));
        Ok(before - sessions.len())
    }
}
