//! Integration tests for token validation against real stores.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use warden_session::{
    AccessToken, AccessTokenValidator, CacheConfig, Error, MemorySessionStore, Result,
    SessionCache, SessionRecord, SessionStore, SqliteSessionStore, UnauthorizedReason,
    ValidationError,
};

/// Store wrapper that counts every call.
#[derive(Default)]
struct CountingStore {
    inner: MemorySessionStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn get(&self, token: &AccessToken) -> Result<Option<SessionRecord>> {
        self.hit();
        self.inner.get(token).await
    }

    async fn insert(&self, record: &SessionRecord) -> Result<()> {
        self.hit();
        self.inner.insert(record).await
    }

    async fn remove(&self, token: &AccessToken) -> Result<bool> {
        self.hit();
        self.inner.remove(token).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        self.hit();
        self.inner.purge_expired(now).await
    }
}

/// Store whose backend is down.
struct UnavailableStore;

#[async_trait]
impl SessionStore for UnavailableStore {
    async fn get(&self, _token: &AccessToken) -> Result<Option<SessionRecord>> {
        Err(Error::Unavailable("connection refused".to_string()))
    }

    async fn insert(&self, _record: &SessionRecord) -> Result<()> {
        Err(Error::Unavailable("connection refused".to_string()))
    }

    async fn remove(&self, _token: &AccessToken) -> Result<bool> {
        Err(Error::Unavailable("connection refused".to_string()))
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize> {
        Err(Error::Unavailable("connection refused".to_string()))
    }
}

fn validator_over(store: Arc<dyn SessionStore>) -> AccessTokenValidator {
    AccessTokenValidator::new(SessionCache::with_store(CacheConfig::new(), store))
}

#[tokio::test]
async fn empty_token_never_reaches_the_store() {
    let store = Arc::new(CountingStore::default());
    let validator = validator_over(store.clone());

    let err = validator.validate(&AccessToken::EMPTY).await.unwrap_err();
    assert_eq!(err.reason(), Some(UnauthorizedReason::MissingToken));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn created_session_validates_for_its_user() {
    let store = Arc::new(SqliteSessionStore::open_in_memory().unwrap());
    let validator = validator_over(store.clone());

    let record = store
        .create("001", Duration::from_secs(600), false)
        .await
        .unwrap();
    let session = validator.validate(&record.token).await.unwrap();
    assert_eq!(session.user_id, "001");
}

#[tokio::test]
async fn expired_session_in_durable_store_is_rejected() {
    let store = Arc::new(SqliteSessionStore::open_in_memory().unwrap());
    let now = Utc::now();
    let record = SessionRecord::new(
        AccessToken::generate(),
        "001",
        now - chrono::Duration::seconds(600),
        now - chrono::Duration::seconds(1),
        false,
    )
    .unwrap();
    store.insert(&record).await.unwrap();

    let validator = validator_over(store.clone());
    let err = validator.validate(&record.token).await.unwrap_err();
    assert_eq!(
        err.reason(),
        Some(UnauthorizedReason::SessionNotFoundOrExpired)
    );

    // Still present in the store; the validator applied expiry itself.
    assert!(store.get(&record.token).await.unwrap().is_some());
}

#[tokio::test]
async fn one_time_session_validates_once() {
    let store = Arc::new(SqliteSessionStore::open_in_memory().unwrap());
    let validator = validator_over(store.clone());
    let record = validator
        .cache()
        .create("001", Some(Duration::from_secs(600)), true)
        .await
        .unwrap();

    assert!(validator.validate(&record.token).await.is_ok());
    let err = validator.validate(&record.token).await.unwrap_err();
    assert_eq!(
        err.reason(),
        Some(UnauthorizedReason::SessionNotFoundOrExpired)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_one_time_validation_has_exactly_one_winner() {
    for round in 0..50 {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let validator = validator_over(store.clone());
        let record = store
            .create("001", Duration::from_secs(600), true)
            .await
            .unwrap();

        // Half the rounds start with the session already cached.
        if round % 2 == 0 {
            validator.cache().get(&record.token).await.unwrap();
        }

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let validator = validator.clone();
                let token = record.token;
                tokio::spawn(async move { validator.validate(&token).await })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        let mut winners = 0;
        for result in results {
            match result.unwrap() {
                Ok(session) => {
                    assert_eq!(session.user_id, "001");
                    winners += 1;
                }
                Err(ValidationError::Unauthorized(reason)) => {
                    assert_eq!(reason, UnauthorizedReason::SessionNotFoundOrExpired);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(winners, 1, "round {round}");
        assert!(validator.validate(&record.token).await.is_err());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reusable_validation_all_succeed() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let validator = validator_over(store.clone());
    let record = store
        .create("001", Duration::from_secs(600), false)
        .await
        .unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let validator = validator.clone();
            let token = record.token;
            tokio::spawn(async move { validator.validate(&token).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert!(result.unwrap().is_ok());
    }
}

#[tokio::test]
async fn removed_session_is_not_resurrected_by_cache() {
    let store = Arc::new(CountingStore::default());
    let validator = validator_over(store.clone());
    let record = validator.cache().create("001", None, false).await.unwrap();

    assert!(validator.validate(&record.token).await.is_ok());
    assert!(validator.cache().remove(&record.token).await.unwrap());
    assert!(validator.validate(&record.token).await.is_err());
}

#[tokio::test]
async fn store_outage_is_distinct_from_missing_session() {
    let validator = validator_over(Arc::new(UnavailableStore));
    let err = validator
        .validate(&AccessToken::generate())
        .await
        .unwrap_err();
    assert!(matches!(err, ValidationError::StorageUnavailable(_)));
    assert_eq!(err.reason(), None);
    assert!(!err.to_string().contains("connection refused"));
}
