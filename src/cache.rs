//! C2 — Cache namespace.
//!
//! A read-through cache keyed by logical name, backed by the
//! coordination store. `evict_all` removes every key in a namespace;
//! writers always call it before returning so readers never observe a
//! stale `count` alongside a fresh `page`. Stampede protection is
//! intentionally absent for page-level keys (see DESIGN.md) — coarse
//! eviction plus warm-up keeps the hot set resident instead.

use crate::coordination::CoordinationStore;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Read-through cache over one logical namespace (e.g. `cards`).
pub struct CacheNamespace {
    store: Arc<dyn CoordinationStore>,
    namespace: &'static str,
    default_ttl: Duration,
    counters: CacheCounters,
}

impl CacheNamespace {
    pub fn new(store: Arc<dyn CoordinationStore>, namespace: &'static str, default_ttl: Duration) -> Self {
        Self {
            store,
            namespace,
            default_ttl,
            counters: CacheCounters::default(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Returns the cached value if present; otherwise invokes `loader`
    /// exactly once for this miss and stores the result with the
    /// namespace's default TTL. Coordination-store failures on the read
    /// path degrade to calling `loader` directly — slower, still correct.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, loader: F) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let full_key = self.full_key(key);

        match self.store.get(&full_key).await {
            Ok(Some(raw)) => {
                if let Ok(value) = serde_json::from_str::<T>(&raw) {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("cache read failed for {full_key}, falling back to loader: {e}");
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let value = loader().await?;

        if let Ok(serialized) = serde_json::to_string(&value) {
            if let Err(e) = self.store.set(&full_key, &serialized, Some(self.default_ttl)).await {
                tracing::warn!("cache write failed for {full_key}: {e}");
            }
        }

        Ok(value)
    }

    /// Unconditional write — used when a caller has already computed a
    /// value and wants it warm (e.g. §4.9.3 warm-up).
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let full_key = self.full_key(key);
        let serialized = serde_json::to_string(value)?;
        self.store.set(&full_key, &serialized, Some(self.default_ttl)).await?;
        Ok(())
    }

    /// Removes every key in this namespace. Callers (writers) must call
    /// this before returning success so a subsequent read observes the
    /// new state — see the cache-consistency testable property.
    pub async fn evict_all(&self) -> anyhow::Result<u64> {
        let removed = self.store.scan_delete(&format!("{}:*", self.namespace)).await?;
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        Ok(removed)
    }

    /// Boolean presence check without altering recency.
    pub async fn probe(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.store.exists(&self.full_key(key)).await?)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.hits.store(0, Ordering::Relaxed);
        self.counters.misses.store(0, Ordering::Relaxed);
        self.counters.invalidations.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::{CoordResult, CoordinationStore};
    use async_trait::async_trait;
    use dashmap::DashMap;
    use std::sync::atomic::AtomicU64;

    #[derive(Default)]
    struct FakeStore {
        data: DashMap<String, String>,
        fail_reads: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl CoordinationStore for FakeStore {
        async fn set_if_absent(&self, key: &str, value: &str, _ttl: std::time::Duration) -> CoordResult<bool> {
            if self.data.contains_key(key) {
                Ok(false)
            } else {
                self.data.insert(key.to_string(), value.to_string());
                Ok(true)
            }
        }

        async fn get(&self, key: &str) -> CoordResult<Option<String>> {
            if self.fail_reads.load(Ordering::Relaxed) {
                return Err(crate::coordination::CoordinationError("down".into()));
            }
            Ok(self.data.get(key).map(|v| v.clone()))
        }

        async fn set(&self, key: &str, value: &str, _ttl: Option<std::time::Duration>) -> CoordResult<()> {
            self.data.insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn del(&self, key: &str) -> CoordResult<bool> {
            Ok(self.data.remove(key).is_some())
        }

        async fn exists(&self, key: &str) -> CoordResult<bool> {
            Ok(self.data.contains_key(key))
        }

        async fn scan_delete(&self, pattern: &str) -> CoordResult<u64> {
            let prefix = pattern.trim_end_matches('*');
            let keys: Vec<String> = self
                .data
                .iter()
                .map(|e| e.key().clone())
                .filter(|k| k.starts_with(prefix))
                .collect();
            let count = keys.len() as u64;
            for k in keys {
                self.data.remove(&k);
            }
            Ok(count)
        }

        async fn list_push_left(&self, _queue: &str, _value: &str) -> CoordResult<()> {
            Ok(())
        }
        async fn list_pop_right_blocking(&self, _queue: &str, _timeout: std::time::Duration) -> CoordResult<Option<String>> {
            Ok(None)
        }
        async fn list_pop_right_nonblocking(&self, _queue: &str) -> CoordResult<Option<String>> {
            Ok(None)
        }
        async fn list_range(&self, _queue: &str) -> CoordResult<Vec<String>> {
            Ok(vec![])
        }
        async fn list_len(&self, _queue: &str) -> CoordResult<u64> {
            Ok(0)
        }
    }

    fn namespace(store: Arc<FakeStore>) -> CacheNamespace {
        CacheNamespace::new(store, "cards", Duration::from_secs(60))
    }

    #[tokio::test]
    async fn second_read_hits_cache() {
        let store = Arc::new(FakeStore::default());
        let ns = namespace(store);
        let calls = Arc::new(AtomicU64::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let _: i32 = ns
                .get_or_compute("name:Dark Magician", || async move {
                    calls.fetch_add(1, Ordering::Relaxed);
                    Ok(42)
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(ns.stats().hits, 1);
        assert_eq!(ns.stats().misses, 1);
    }

    #[tokio::test]
    async fn evict_all_forces_recompute() {
        let store = Arc::new(FakeStore::default());
        let ns = namespace(store);

        let _: i32 = ns.get_or_compute("count", || async { Ok(1) }).await.unwrap();
        ns.evict_all().await.unwrap();
        let value: i32 = ns.get_or_compute("count", || async { Ok(2) }).await.unwrap();

        assert_eq!(value, 2);
        assert_eq!(ns.stats().misses, 2);
    }

    #[tokio::test]
    async fn read_failure_falls_back_to_loader() {
        let store = Arc::new(FakeStore::default());
        store.fail_reads.store(true, Ordering::Relaxed);
        let ns = namespace(store);

        let value: i32 = ns.get_or_compute("count", || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
