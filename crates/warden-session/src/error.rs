//! Error types for session storage and cache operations.

/// Error type for session store and cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing store could not be reached or failed mid-operation.
    ///
    /// Distinct from a missing session: callers treat this as transient.
    #[error("Session storage unavailable: {0}")]
    Unavailable(String),

    /// A session lifetime of zero was requested.
    #[error("Invalid session lifetime: expiry must be after creation")]
    InvalidLifetime,

    /// A token string could not be parsed.
    #[error("Invalid access token format")]
    InvalidToken,

    /// Schema migration failed when opening a durable store.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Unavailable(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Unavailable(format!("storage task failed: {e}"))
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
