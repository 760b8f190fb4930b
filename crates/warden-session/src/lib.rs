//! Session subsystem for Warden.
//!
//! This crate provides everything the dispatcher needs to authenticate a
//! caller:
//! - [`SessionRecord`] and the opaque [`AccessToken`] that keys it
//! - the [`SessionStore`] persistence boundary, with in-memory and SQLite
//!   backends
//! - a read-through / write-through [`SessionCache`] with time-based expiry
//! - the [`AccessTokenValidator`], including one-time session consumption
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_session::{AccessTokenValidator, CacheConfig, SessionCache};
//!
//! let cache = SessionCache::in_memory(CacheConfig::default());
//! let record = cache.create("001", None, false).await?;
//!
//! let validator = AccessTokenValidator::new(cache);
//! let session = validator.validate(&record.token).await?;
//! ```

mod cache;
mod config;
mod error;
mod record;
mod sqlite;
mod store;
mod sweep;
mod token;
mod validator;

pub use cache::{CacheEntry, CacheStats, SessionCache, SweepReport};
pub use config::{
    CacheConfig, DEFAULT_MAX_STALENESS, DEFAULT_SESSION_TTL, DEFAULT_SWEEP_INTERVAL,
};
pub use error::{Error, Result};
pub use record::SessionRecord;
pub use sqlite::SqliteSessionStore;
pub use store::{MemorySessionStore, SessionStore};
pub use sweep::{SweepHandle, spawn_sweeper, spawn_sweeper_every};
pub use token::AccessToken;
pub use validator::{AccessTokenValidator, UnauthorizedReason, ValidationError};
