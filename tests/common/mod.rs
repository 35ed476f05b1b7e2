//! Shared fixtures for integration tests: an in-memory coordination
//! store good enough to back the cache/lock/queue services without a
//! live Redis.

use async_trait::async_trait;
use dashmap::DashMap;
use deckvault_core::coordination::{CoordResult, CoordinationStore};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

#[derive(Default)]
pub struct InMemoryStore {
    kv: DashMap<String, String>,
    queues: Mutex<HashMap<String, VecDeque<String>>>,
}

#[async_trait]
impl CoordinationStore for InMemoryStore {
    async fn set_if_absent(&self, key: &str, value: &str, _ttl: Duration) -> CoordResult<bool> {
        Ok(self.kv.insert(key.to_string(), value.to_string()).is_none())
    }

    async fn get(&self, key: &str) -> CoordResult<Option<String>> {
        Ok(self.kv.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: &str, _ttl: Option<Duration>) -> CoordResult<()> {
        self.kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> CoordResult<bool> {
        Ok(self.kv.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> CoordResult<bool> {
        Ok(self.kv.contains_key(key))
    }

    async fn scan_delete(&self, pattern: &str) -> CoordResult<u64> {
        let prefix = pattern.trim_end_matches('*');
        let matching: Vec<String> =
            self.kv.iter().map(|e| e.key().clone()).filter(|k| k.starts_with(prefix)).collect();
        for key in &matching {
            self.kv.remove(key);
        }
        Ok(matching.len() as u64)
    }

    async fn list_push_left(&self, queue: &str, value: &str) -> CoordResult<()> {
        self.queues.lock().entry(queue.to_string()).or_default().push_front(value.to_string());
        Ok(())
    }

    async fn list_pop_right_blocking(&self, queue: &str, _timeout: Duration) -> CoordResult<Option<String>> {
        Ok(self.queues.lock().entry(queue.to_string()).or_default().pop_back())
    }

    async fn list_pop_right_nonblocking(&self, queue: &str) -> CoordResult<Option<String>> {
        Ok(self.queues.lock().entry(queue.to_string()).or_default().pop_back())
    }

    async fn list_range(&self, queue: &str) -> CoordResult<Vec<String>> {
        Ok(self.queues.lock().entry(queue.to_string()).or_default().iter().rev().cloned().collect())
    }

    async fn list_len(&self, queue: &str) -> CoordResult<u64> {
        Ok(self.queues.lock().entry(queue.to_string()).or_default().len() as u64)
    }
}
