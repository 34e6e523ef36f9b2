//! Query caching
//!
//! A read call is identified by its [`CacheKey`]: the route key plus the
//! substituted path parameters. Identical keys are the same logical resource, so a
//! cache may serve them from one fetch.

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::Result;

/// Identity of a read call
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    /// Dot-joined contract key (`"posts.get"`)
    pub route: String,
    pub params: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(route: impl Into<String>, params: BTreeMap<String, String>) -> Self {
        Self {
            route: route.into(),
            params,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.route)?;
        for (name, value) in &self.params {
            write!(f, ":{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Caching layer above read calls
#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Return the cached value for `key`, or run `fetch` and remember its success
    async fn get_or_fetch<'a>(
        &'a self,
        key: CacheKey,
        fetch: BoxFuture<'a, Result<Value>>,
    ) -> Result<Value>;

    /// Drop a cached value so the next call fetches again
    fn invalidate(&self, key: &CacheKey);
}

/// In-memory cache that fetches each key at most once.
///
/// Concurrent callers for the same key wait on the first fetch. Failed fetches are
/// not stored, so the next caller retries.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<Value>>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value, if the key has been fetched successfully
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.entries.lock().get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of keys held, including fetches still in flight
    pub fn tracked_keys(&self) -> usize {
        self.entries.lock().len()
    }

    /// Drop the empty cell a failed fetch left behind, unless another caller has
    /// since filled or replaced it
    fn forget_failed(&self, key: &CacheKey, cell: &Arc<OnceCell<Value>>) {
        let mut entries = self.entries.lock();
        let stale = entries
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, cell) && !current.initialized());
        if stale {
            entries.remove(key);
        }
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[async_trait]
impl QueryCache for MemoryCache {
    async fn get_or_fetch<'a>(
        &'a self,
        key: CacheKey,
        fetch: BoxFuture<'a, Result<Value>>,
    ) -> Result<Value> {
        let cell = self.entries.lock().entry(key.clone()).or_default().clone();

        if let Some(value) = cell.get() {
            debug!("Cache hit for {}", key);
            return Ok(value.clone());
        }

        let result = cell.get_or_try_init(|| fetch).await.cloned();
        if result.is_err() {
            self.forget_failed(&key, &cell);
        }
        result
    }

    fn invalidate(&self, key: &CacheKey) {
        if self.entries.lock().remove(key).is_some() {
            debug!("Invalidated {}", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key(id: &str) -> CacheKey {
        CacheKey::new("posts.get", BTreeMap::from([("id".to_string(), id.to_string())]))
    }

    #[test]
    fn test_key_identity() {
        assert_eq!(key("1"), key("1"));
        assert_ne!(key("1"), key("2"));
        assert_ne!(key("1"), CacheKey::new("users.get", key("1").params));
        assert_eq!(key("1").to_string(), "posts.get:id=1");
    }

    #[tokio::test]
    async fn test_concurrent_calls_fetch_once() {
        let cache = MemoryCache::new();
        let fetches = AtomicUsize::new(0);
        let counter = &fetches;

        let fetch = move || {
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<_, ClientError>(json!({"id": 1}))
            }
            .boxed()
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch(key("1"), fetch()),
            cache.get_or_fetch(key("1"), fetch()),
            cache.get_or_fetch(key("1"), fetch()),
        );
        assert_eq!(a.unwrap(), json!({"id": 1}));
        assert_eq!(b.unwrap(), json!({"id": 1}));
        assert_eq!(c.unwrap(), json!({"id": 1}));
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        cache.get_or_fetch(key("2"), fetch()).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = MemoryCache::new();

        let failed = cache
            .get_or_fetch(
                key("1"),
                async { Err::<Value, _>(ClientError::Fetch { status: 502, body: Value::Null }) }.boxed(),
            )
            .await;
        assert!(failed.is_err());
        assert!(cache.get(&key("1")).is_none());

        let value = cache
            .get_or_fetch(key("1"), async { Ok::<_, ClientError>(json!("fresh")) }.boxed())
            .await
            .unwrap();
        assert_eq!(value, json!("fresh"));
        assert_eq!(cache.get(&key("1")), Some(json!("fresh")));
    }

    #[tokio::test]
    async fn test_failed_keys_do_not_accumulate() {
        let cache = MemoryCache::new();

        for id in 0..100 {
            let result = cache
                .get_or_fetch(
                    key(&id.to_string()),
                    async { Err::<Value, _>(ClientError::Http { status: 404, body: Value::Null }) }
                        .boxed(),
                )
                .await;
            assert!(result.is_err());
        }
        assert_eq!(cache.tracked_keys(), 0);
        assert!(cache.is_empty());

        cache
            .get_or_fetch(key("ok"), async { Ok::<_, ClientError>(json!(1)) }.boxed())
            .await
            .unwrap();
        assert_eq!(cache.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let cache = MemoryCache::new();

        cache
            .get_or_fetch(key("1"), async { Ok::<_, ClientError>(json!(1)) }.boxed())
            .await
            .unwrap();
        let cached = cache
            .get_or_fetch(key("1"), async { Ok::<_, ClientError>(json!(2)) }.boxed())
            .await
            .unwrap();
        assert_eq!(cached, json!(1));

        cache.invalidate(&key("1"));
        let refreshed = cache
            .get_or_fetch(key("1"), async { Ok::<_, ClientError>(json!(2)) }.boxed())
            .await
            .unwrap();
        assert_eq!(refreshed, json!(2));
    }
}
