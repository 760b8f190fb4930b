//! Configuration for the session cache.

use std::time::Duration;

/// Default lifetime for sessions created without an explicit one (1 hour).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Default age after which a cached session is re-read from the store.
pub const DEFAULT_MAX_STALENESS: Duration = Duration::from_secs(5);

/// Default interval for the background expiry sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the session cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime applied by [`SessionCache::create`](crate::SessionCache::create)
    /// when the caller passes none.
    pub default_ttl: Duration,

    /// How long a cached record is served from memory before the store is
    /// consulted again. Zero re-reads the store on every lookup.
    pub max_staleness: Duration,

    /// Whether to run the periodic expiry sweep.
    /// If false, expired sessions are only evicted on access.
    pub enable_sweep: bool,

    /// Interval for the sweep task (if enabled).
    pub sweep_interval: Duration,

    /// Whether the sweep also purges expired rows from the durable store.
    pub purge_store: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_SESSION_TTL,
            max_staleness: DEFAULT_MAX_STALENESS,
            enable_sweep: true,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            purge_store: true,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default session lifetime.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set how long cached records are trusted without the store.
    pub fn with_max_staleness(mut self, max_staleness: Duration) -> Self {
        self.max_staleness = max_staleness;
        self
    }

    /// Enable or disable the background sweep.
    pub fn with_sweep(mut self, enabled: bool) -> Self {
        self.enable_sweep = enabled;
        self
    }

    /// Set the sweep interval. A zero interval disables the sweep.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        if interval.is_zero() {
            self.enable_sweep = false;
        }
        self
    }

    /// Choose whether the sweep purges the durable store as well.
    pub fn with_store_purge(mut self, enabled: bool) -> Self {
        self.purge_store = enabled;
        self
    }
}
