//! Read-through / write-through session cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::error::Result;
use crate::record::SessionRecord;
use crate::store::{MemorySessionStore, SessionStore};
use crate::token::AccessToken;

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Mirrored record.
    pub record: SessionRecord,

    /// When this entry was inserted into cache.
    pub cached_at: Instant,
}

impl CacheEntry {
    /// Create a new cache entry.
    pub fn new(record: SessionRecord) -> Self {
        Self {
            record,
            cached_at: Instant::now(),
        }
    }
}

/// Shared state behind every clone of a [`SessionCache`].
struct CacheInner {
    /// In-memory mirror of the store. Never locked across store I/O.
    entries: RwLock<HashMap<AccessToken, CacheEntry>>,

    /// Durable backend.
    store: Arc<dyn SessionStore>,

    /// Bumped under the write lock by every removal. A read-through fill
    /// only lands if no removal happened while it was loading.
    removals: AtomicU64,

    hits: AtomicU64,
    misses: AtomicU64,
}

/// In-memory session cache in front of a [`SessionStore`].
///
/// - `get` reads through to the store on a miss and keeps the result
/// - `set`, `create` and `remove` write through to the store
/// - expiry is lazy (on lookup) plus an optional periodic sweep; there is
///   no capacity bound
///
/// Cloning is cheap and every clone shares the same map and store.
#[derive(Clone)]
pub struct SessionCache {
    inner: Arc<CacheInner>,
    config: CacheConfig,
}

impl SessionCache {
    /// Create a cache over a process-local [`MemorySessionStore`].
    pub fn in_memory(config: CacheConfig) -> Self {
        Self::with_store(config, Arc::new(MemorySessionStore::new()))
    }

    /// Create a cache over the given durable store.
    pub fn with_store(config: CacheConfig, store: Arc<dyn SessionStore>) -> Self {
        let inner = CacheInner {
            entries: RwLock::new(HashMap::new()),
            store,
            removals: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        };

        Self {
            inner: Arc::new(inner),
            config,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the backing store.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.inner.store
    }

    /// Get the current number of cached entries (expired ones included until swept).
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    /// Look up a session, loading it from the store on a miss.
    ///
    /// Expired sessions are reported as absent and evicted from memory. A
    /// cached entry older than [`CacheConfig::max_staleness`] is re-read from
    /// the store, so removals made by another process (or directly on the
    /// store) take effect within that window.
    pub async fn get(&self, token: &AccessToken) -> Result<Option<SessionRecord>> {
        let now = Utc::now();

        // First check memory
        let cached = self.inner.entries.read().get(token).cloned();
        let had_entry = cached.is_some();
        if let Some(entry) = cached {
            if entry.record.is_expired_at(now) {
                debug!(token = %token.log_prefix(), "Cached session expired, evicting");
                self.evict(token);
                return Ok(None);
            }
            if entry.cached_at.elapsed() < self.config.max_staleness {
                trace!(token = %token.log_prefix(), "Session found in cache");
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Some(entry.record));
            }
            trace!(token = %token.log_prefix(), "Cached session stale, revalidating");
        }

        // Cache miss - read through to the store
        self.inner.misses.fetch_add(1, Ordering::Relaxed);
        let epoch = self.inner.removals.load(Ordering::Acquire);
        debug!(token = %token.log_prefix(), "Session cache miss, loading from store");

        let loaded = self.inner.store.get(token).await?;
        let Some(record) = loaded.filter(|r| !r.is_expired_at(Utc::now())) else {
            if had_entry {
                debug!(token = %token.log_prefix(), "Session gone from store, evicting");
                self.evict(token);
            }
            return Ok(None);
        };

        let mut entries = self.inner.entries.write();
        if self.inner.removals.load(Ordering::Acquire) == epoch {
            entries.insert(*token, CacheEntry::new(record.clone()));
            trace!(cache_size = entries.len(), "Session loaded from store");
        } else {
            trace!("Removal raced the load; not caching");
        }

        Ok(Some(record))
    }

    /// Insert or replace a session in the store and the cache.
    pub async fn set(&self, record: SessionRecord) -> Result<()> {
        self.inner.store.insert(&record).await?;
        self.inner
            .entries
            .write()
            .insert(record.token, CacheEntry::new(record));
        Ok(())
    }

    /// Create a session in the store and cache it.
    ///
    /// `expires_in` defaults to the configured session lifetime.
    pub async fn create(
        &self,
        user_id: &str,
        expires_in: Option<Duration>,
        one_time: bool,
    ) -> Result<SessionRecord> {
        let ttl = expires_in.unwrap_or(self.config.default_ttl);
        let record = self.inner.store.create(user_id, ttl, one_time).await?;

        debug!(
            token = %record.token.log_prefix(),
            user_id = %record.user_id,
            one_time,
            "Session created"
        );

        self.inner
            .entries
            .write()
            .insert(record.token, CacheEntry::new(record.clone()));
        Ok(record)
    }

    /// Remove a session from the store and the cache.
    ///
    /// Returns `true` if this call removed it from the store. Concurrent
    /// removals of one token see exactly one `true`. The entry leaves memory
    /// before the store is touched, so dropping this future part-way never
    /// leaves a removed session cached.
    pub async fn remove(&self, token: &AccessToken) -> Result<bool> {
        self.forget(token);
        let removed = self.inner.store.remove(token).await?;
        // Fills that loaded the row before the delete must not land either.
        self.forget(token);

        debug!(token = %token.log_prefix(), removed, "Session removed");
        Ok(removed)
    }

    /// Evict `token` and invalidate any read-through fill in flight.
    fn forget(&self, token: &AccessToken) {
        let mut entries = self.inner.entries.write();
        entries.remove(token);
        self.inner.removals.fetch_add(1, Ordering::Release);
    }

    /// Drop a session from memory only, leaving the store untouched.
    pub fn evict(&self, token: &AccessToken) {
        self.inner.entries.write().remove(token);
    }

    /// Check if a live session is cached (without loading).
    pub fn contains(&self, token: &AccessToken) -> bool {
        let now = Utc::now();
        self.inner
            .entries
            .read()
            .get(token)
            .is_some_and(|e| !e.record.is_expired_at(now))
    }

    /// Peek at a cached session without touching the store.
    pub fn peek(&self, token: &AccessToken) -> Option<SessionRecord> {
        let now = Utc::now();
        self.inner
            .entries
            .read()
            .get(token)
            .filter(|e| !e.record.is_expired_at(now))
            .map(|e| e.record.clone())
    }

    /// Evict every expired entry from memory. Returns how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.inner.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.record.is_expired_at(now));
        let count = before - entries.len();

        if count > 0 {
            debug!(count, "Evicted expired sessions from cache");
        }
        count
    }

    /// Evict expired entries and, if configured, purge them from the store.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let evicted = self.evict_expired();
        let purged = if self.config.purge_store {
            self.inner.store.purge_expired(Utc::now()).await?
        } else {
            0
        };
        Ok(SweepReport { evicted, purged })
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of cached entries.
    pub size: usize,

    /// Lookups served from memory.
    pub hits: u64,

    /// Lookups that went to the store.
    pub misses: u64,
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries dropped from memory.
    pub evicted: usize,

    /// Rows purged from the durable store.
    pub purged: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::FutureExt;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    /// Store whose `get` or `remove` can be held open until released.
    #[derive(Default)]
    struct GatedStore {
        inner: MemorySessionStore,
        hold_get: AtomicBool,
        hold_remove: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl GatedStore {
        async fn pass(&self, hold: &AtomicBool) {
            if hold.load(Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
        }
    }

    #[async_trait]
    impl SessionStore for GatedStore {
        async fn get(&self, token: &AccessToken) -> Result<Option<SessionRecord>> {
            // Held after the read, so the caller sits on a loaded row.
            let found = self.inner.get(token).await;
            self.pass(&self.hold_get).await;
            found
        }

        async fn insert(&self, record: &SessionRecord) -> Result<()> {
            self.inner.insert(record).await
        }

        async fn remove(&self, token: &AccessToken) -> Result<bool> {
            self.pass(&self.hold_remove).await;
            self.inner.remove(token).await
        }

        async fn purge_expired(&self, now: chrono::DateTime<Utc>) -> Result<usize> {
            self.inner.purge_expired(now).await
        }
    }

    fn expired_record(user: &str) -> SessionRecord {
        let now = Utc::now();
        SessionRecord::new(
            AccessToken::generate(),
            user,
            now - chrono::Duration::seconds(120),
            now - chrono::Duration::seconds(60),
            false,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let cache = SessionCache::in_memory(CacheConfig::new());

        let record = cache
            .create("001", Some(Duration::from_secs(600)), false)
            .await
            .unwrap();

        let retrieved = cache.get(&record.token).await.unwrap().unwrap();
        assert_eq!(retrieved, record);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_not_found() {
        let cache = SessionCache::in_memory(CacheConfig::new());
        let result = cache.get(&AccessToken::generate()).await.unwrap();
        assert!(result.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_read_through_populates_memory() {
        let store = Arc::new(MemorySessionStore::new());
        let record = store
            .create("001", Duration::from_secs(600), false)
            .await
            .unwrap();

        let cache = SessionCache::with_store(CacheConfig::new(), store);
        assert!(!cache.contains(&record.token));

        let loaded = cache.get(&record.token).await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(cache.contains(&record.token));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn test_repeated_get_is_idempotent() {
        let cache = SessionCache::in_memory(CacheConfig::new());
        let record = cache.create("001", None, false).await.unwrap();

        let first = cache.get(&record.token).await.unwrap();
        let second = cache.get(&record.token).await.unwrap();
        let third = cache.get(&record.token).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[tokio::test]
    async fn test_remove_then_get_is_absent() {
        let store = Arc::new(MemorySessionStore::new());
        let cache = SessionCache::with_store(CacheConfig::new(), store.clone());
        let record = cache.create("001", None, false).await.unwrap();

        assert!(cache.remove(&record.token).await.unwrap());
        assert!(cache.get(&record.token).await.unwrap().is_none());
        assert!(store.is_empty());
        assert!(!cache.remove(&record.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_writes_through() {
        let store = Arc::new(MemorySessionStore::new());
        let cache = SessionCache::with_store(CacheConfig::new(), store.clone());
        let record = SessionRecord::issue("001", Duration::from_secs(60), false).unwrap();

        cache.set(record.clone()).await.unwrap();
        assert_eq!(store.get(&record.token).await.unwrap(), Some(record.clone()));
        assert_eq!(cache.peek(&record.token), Some(record));
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted_on_lookup() {
        let cache = SessionCache::in_memory(CacheConfig::new());
        let record = expired_record("001");
        cache.set(record.clone()).await.unwrap();
        assert_eq!(cache.len(), 1);

        assert!(cache.get(&record.token).await.unwrap().is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_expired_in_store_is_not_cached() {
        let store = Arc::new(MemorySessionStore::new());
        let record = expired_record("001");
        store.insert(&record).await.unwrap();

        let cache = SessionCache::with_store(CacheConfig::new(), store);
        assert!(cache.get(&record.token).await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let store = Arc::new(MemorySessionStore::new());
        let cache = SessionCache::with_store(CacheConfig::new(), store.clone());

        for i in 0..3 {
            cache.set(expired_record(&format!("user-{i}"))).await.unwrap();
        }
        let live = cache.create("live", None, false).await.unwrap();

        let report = cache.sweep_expired().await.unwrap();
        assert_eq!(report, SweepReport { evicted: 3, purged: 3 });
        assert_eq!(cache.len(), 1);
        assert_eq!(store.len(), 1);
        assert!(cache.contains(&live.token));
    }

    #[tokio::test]
    async fn test_sweep_without_store_purge() {
        let store = Arc::new(MemorySessionStore::new());
        let cache =
            SessionCache::with_store(CacheConfig::new().with_store_purge(false), store.clone());
        cache.set(expired_record("001")).await.unwrap();

        let report = cache.sweep_expired().await.unwrap();
        assert_eq!(report, SweepReport { evicted: 1, purged: 0 });
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_fill_racing_remove_is_not_cached() {
        let store = Arc::new(GatedStore::default());
        let record = store
            .inner
            .create("001", Duration::from_secs(600), false)
            .await
            .unwrap();
        let cache = SessionCache::with_store(CacheConfig::new(), store.clone());

        store.hold_get.store(true, Ordering::SeqCst);
        let fill = tokio::spawn({
            let cache = cache.clone();
            let token = record.token;
            async move { cache.get(&token).await }
        });

        // The fill has loaded the row; remove the session before it lands.
        store.entered.notified().await;
        assert!(cache.remove(&record.token).await.unwrap());
        store.hold_get.store(false, Ordering::SeqCst);
        store.release.notify_one();

        assert_eq!(fill.await.unwrap().unwrap(), Some(record.clone()));
        assert!(!cache.contains(&record.token));
        assert!(cache.get(&record.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_remove_leaves_nothing_cached() {
        let store = Arc::new(GatedStore::default());
        let cache = SessionCache::with_store(CacheConfig::new(), store.clone());
        let record = cache.create("001", None, false).await.unwrap();
        assert!(cache.contains(&record.token));

        store.hold_remove.store(true, Ordering::SeqCst);
        assert!(cache.remove(&record.token).now_or_never().is_none());

        assert!(!cache.contains(&record.token));
        assert!(cache.peek(&record.token).is_none());
    }

    #[tokio::test]
    async fn test_store_removal_seen_after_staleness_window() {
        let store = Arc::new(MemorySessionStore::new());
        let config = CacheConfig::new().with_max_staleness(Duration::from_millis(20));
        let cache = SessionCache::with_store(config, store.clone());
        let record = cache.create("001", None, false).await.unwrap();

        // Removed behind the cache's back, as another process would.
        assert!(store.remove(&record.token).await.unwrap());
        assert!(cache.get(&record.token).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get(&record.token).await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_zero_staleness_always_revalidates() {
        let store = Arc::new(MemorySessionStore::new());
        let config = CacheConfig::new().with_max_staleness(Duration::ZERO);
        let cache = SessionCache::with_store(config, store.clone());
        let record = cache.create("001", None, false).await.unwrap();

        assert!(cache.get(&record.token).await.unwrap().is_some());
        assert_eq!(cache.stats().hits, 0);

        store.remove(&record.token).await.unwrap();
        assert!(cache.get(&record.token).await.unwrap().is_none());
        assert!(!cache.contains(&record.token));
    }

    #[tokio::test]
    async fn test_independent_instances_do_not_share_state() {
        let a = SessionCache::in_memory(CacheConfig::new());
        let b = SessionCache::in_memory(CacheConfig::new());
        let record = a.create("001", None, false).await.unwrap();

        assert!(a.get(&record.token).await.unwrap().is_some());
        assert!(b.get(&record.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cache = SessionCache::in_memory(CacheConfig::new());
        let clone = cache.clone();
        let record = cache.create("001", None, false).await.unwrap();
        assert!(clone.contains(&record.token));
    }
}
