//! Wiring shared by the CLI commands: stores, caches, and the registry.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{info, warn};
use warden_config::SessionSection;
use warden_dispatch::{FunctionRegistry, ObjectHost};
use warden_session::{
    CacheConfig, MemorySessionStore, SessionCache, SessionStore, SqliteSessionStore,
};

use crate::greeter::Greeter;

/// Build the function registry of every built-in business object.
pub fn build_registry() -> Result<FunctionRegistry> {
    FunctionRegistry::builder()
        .object::<Greeter>()
        .build()
        .context("invalid function declarations")
}

/// Host one instance of every built-in business object.
pub fn build_objects(sessions: &SessionCache) -> ObjectHost {
    ObjectHost::new().with_object(Arc::new(Greeter::new(sessions.clone())))
}

/// Open the configured SQLite store. Errors when no database is configured.
pub fn open_sqlite(section: &SessionSection) -> Result<SqliteSessionStore> {
    let Some(path) = &section.database else {
        anyhow::bail!(
            "no session database configured; set [sessions] database in warden.toml"
        );
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    SqliteSessionStore::open(path)
        .with_context(|| format!("failed to open session database {}", path.display()))
}

/// Build the session cache over the configured store.
pub fn build_cache(section: &SessionSection) -> Result<SessionCache> {
    let store: Arc<dyn SessionStore> = match &section.database {
        Some(path) => {
            info!(path = %path.display(), "Using SQLite session store");
            Arc::new(open_sqlite(section)?)
        }
        None => {
            warn!("No session database configured; sessions will not survive a restart");
            Arc::new(MemorySessionStore::new())
        }
    };

    let config = CacheConfig::new()
        .with_default_ttl(section.default_ttl())
        .with_max_staleness(section.max_staleness())
        .with_sweep_interval(section.sweep_interval().unwrap_or_default());
    Ok(SessionCache::with_store(config, store))
}
