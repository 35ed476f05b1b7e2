//! C3 — Distributed lock.
//!
//! `acquire` maps to `set_if_absent(lock:<key>, sentinel, lease)`.
//! Ownership is implicit and unverified: `release` unconditionally
//! deletes the key. Acceptable because every lease auto-expires and
//! the invariants the lock protects (deck size, per-card copies) are
//! re-checked inside a DB transaction regardless — a stolen release at
//! worst causes a spurious re-race, never a correctness violation.
//!
//! On coordination-store outage, `acquire` fails open (returns `true`):
//! the lock is a latency optimization, not a safety boundary.

use crate::coordination::CoordinationStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct DistributedLock {
    store: Arc<dyn CoordinationStore>,
}

impl DistributedLock {
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self { store }
    }

    fn lock_key(key: &str) -> String {
        format!("lock:{key}")
    }

    /// Attempts to take the lease. Returns `true` both on a genuine
    /// acquire and on a fail-open degraded response.
    pub async fn acquire(&self, key: &str, lease: Duration) -> bool {
        let sentinel = Uuid::new_v4().to_string();
        match self.store.set_if_absent(&Self::lock_key(key), &sentinel, lease).await {
            Ok(acquired) => acquired,
            Err(e) => {
                tracing::warn!("coordination store unreachable during lock acquire for {key}, failing open: {e}");
                true
            }
        }
    }

    /// Unconditional delete. Never fails the caller; a delete against an
    /// already-expired or already-stolen lease is a harmless no-op.
    pub async fn release(&self, key: &str) {
        if let Err(e) = self.store.del(&Self::lock_key(key)).await {
            tracing::warn!("failed to release lock {key}: {e}");
        }
    }

    /// Acquires the lease, runs `action`, releases regardless of outcome,
    /// and returns `None` if the lease could not be acquired (lock
    /// genuinely held, not a coordination outage).
    pub async fn with_lock<T, F, Fut>(&self, key: &str, lease: Duration, action: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.acquire(key, lease).await {
            return None;
        }
        let result = action().await;
        self.release(key).await;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::{CoordResult, CoordinationError};
    use async_trait::async_trait;
    use dashmap::DashMap;

    #[derive(Default)]
    struct FakeStore {
        data: DashMap<String, String>,
        unreachable: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl CoordinationStore for FakeStore {
        async fn set_if_absent(&self, key: &str, value: &str, _ttl: Duration) -> CoordResult<bool> {
            if self.unreachable.load(std::sync::atomic::Ordering::Relaxed) {
                return Err(CoordinationError("down".into()));
            }
            if self.data.contains_key(key) {
                Ok(false)
            } else {
                self.data.insert(key.to_string(), value.to_string());
                Ok(true)
            }
        }
        async fn get(&self, key: &str) -> CoordResult<Option<String>> {
            Ok(self.data.get(key).map(|v| v.clone()))
        }
        async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> CoordResult<()> {
            self.data.insert(key.to_string(), value.to_string());
            Ok(())
        }
        async fn del(&self, key: &str) -> CoordResult<bool> {
            Ok(self.data.remove(key).is_some())
        }
        async fn exists(&self, key: &str) -> CoordResult<bool> {
            Ok(self.data.contains_key(key))
        }
        async fn scan_delete(&self, _pattern: &str) -> CoordResult<u64> {
            Ok(0)
        }
        async fn list_push_left(&self, _queue: &str, _value: &str) -> CoordResult<()> {
            Ok(())
        }
        async fn list_pop_right_blocking(&self, _queue: &str, _timeout: Duration) -> CoordResult<Option<String>> {
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

    #[tokio::test]
    async fn second_acquire_fails_while_held() {
        let store = Arc::new(FakeStore::default());
        let lock = DistributedLock::new(store);

        assert!(lock.acquire("deck:1", Duration::from_secs(5)).await);
        assert!(!lock.acquire("deck:1", Duration::from_secs(5)).await);

        lock.release("deck:1").await;
        assert!(lock.acquire("deck:1", Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn outage_fails_open() {
        let store = Arc::new(FakeStore::default());
        store.unreachable.store(true, std::sync::atomic::Ordering::Relaxed);
        let lock = DistributedLock::new(store);

        assert!(lock.acquire("deck:1", Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn with_lock_releases_after_action() {
        let store = Arc::new(FakeStore::default());
        let lock = DistributedLock::new(store);

        let result = lock.with_lock("deck:1", Duration::from_secs(5), || async { 42 }).await;
        assert_eq!(result, Some(42));

        assert!(lock.acquire("deck:1", Duration::from_secs(5)).await);
    }
}
