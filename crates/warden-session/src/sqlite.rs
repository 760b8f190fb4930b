//! SQLite-backed session store.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::SessionRecord;
use crate::store::SessionStore;
use crate::token::AccessToken;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Durable session store over a single SQLite connection.
///
/// Every call runs on the blocking thread pool so a slow disk never stalls
/// the async runtime.
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `path` and run pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        embedded::migrations::runner()
            .run(&mut conn)
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await?
    }

    /// List live sessions belonging to a user.
    pub async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let user_id = user_id.to_string();
        let now = Utc::now().timestamp_millis();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT token, user_id, created_at, expires_at, one_time
                 FROM sessions WHERE user_id = ?1 AND expires_at > ?2
                 ORDER BY created_at",
            )?;
            let rows = stmt.query_map(params![user_id, now], row_to_parts)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(parts_to_record(row?)?);
            }
            Ok(records)
        })
        .await
    }
}

type RowParts = (String, String, i64, i64, bool);

fn row_to_parts(row: &rusqlite::Row<'_>) -> rusqlite::Result<RowParts> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get::<_, i32>(4)? != 0,
    ))
}

fn parts_to_record((token, user_id, created_at, expires_at, one_time): RowParts) -> Result<SessionRecord> {
    let token: AccessToken = token
        .parse()
        .map_err(|_| Error::Unavailable("corrupt token column".to_string()))?;
    SessionRecord::new(
        token,
        user_id,
        from_millis(created_at)?,
        from_millis(expires_at)?,
        one_time,
    )
    .map_err(|_| Error::Unavailable("corrupt session timestamps".to_string()))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| Error::Unavailable(format!("invalid timestamp {ms}")))
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, token: &AccessToken) -> Result<Option<SessionRecord>> {
        let key = token.to_string();
        self.with_conn(move |conn| {
            let parts = conn
                .query_row(
                    "SELECT token, user_id, created_at, expires_at, one_time
                     FROM sessions WHERE token = ?1",
                    params![key],
                    row_to_parts,
                )
                .optional()?;
            parts.map(parts_to_record).transpose()
        })
        .await
    }

    async fn insert(&self, record: &SessionRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO sessions (token, user_id, created_at, expires_at, one_time)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.token.to_string(),
                    record.user_id,
                    record.created_at.timestamp_millis(),
                    record.expires_at.timestamp_millis(),
                    record.one_time as i32,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, token: &AccessToken) -> Result<bool> {
        let key = token.to_string();
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM sessions WHERE token = ?1", params![key])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now.timestamp_millis();
        let purged = self
            .with_conn(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM sessions WHERE expires_at <= ?1",
                    params![cutoff],
                )?)
            })
            .await?;
        if purged > 0 {
            debug!(count = purged, "Purged expired sessions from SQLite store");
        }
        Ok(purged)
    }
}
