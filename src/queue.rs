//! C5 — Work queue.
//!
//! A queue is a named FIFO list over the coordination store.
//! `enqueue` pushes at the head; `dequeue` pops from the tail. Pop is
//! destructive, so delivery is at-least-once under normal operation
//! and at-most-once in practice — there is no redelivery on handler
//! failure (see DESIGN.md).

use crate::coordination::CoordinationStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const CARD_OPERATIONS: &str = "card-operations";
pub const CACHE_OPERATIONS: &str = "cache-operations";
pub const NOTIFICATIONS: &str = "notifications";

pub const BLOCKING_TIMEOUT: Duration = Duration::from_secs(10);

/// Opaque structured envelope. `payload` carries whatever shape the
/// message type needs; consumers downcast via `serde_json::from_value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl QueueMessage {
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

pub struct WorkQueue {
    store: Arc<dyn CoordinationStore>,
}

impl WorkQueue {
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self { store }
    }

    pub async fn enqueue(&self, queue: &str, message: QueueMessage) -> anyhow::Result<()> {
        let serialized = serde_json::to_string(&message)?;
        self.store.list_push_left(queue, &serialized).await?;
        Ok(())
    }

    pub async fn dequeue_blocking(&self, queue: &str) -> anyhow::Result<Option<QueueMessage>> {
        match self.store.list_pop_right_blocking(queue, BLOCKING_TIMEOUT).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn dequeue_nonblocking(&self, queue: &str) -> anyhow::Result<Option<QueueMessage>> {
        match self.store.list_pop_right_nonblocking(queue).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Read-only snapshot, tail to head (FIFO order, oldest first).
    pub async fn peek(&self, queue: &str) -> anyhow::Result<Vec<QueueMessage>> {
        let raw = self.store.list_range(queue).await?;
        let mut messages: Vec<QueueMessage> = raw
            .iter()
            .filter_map(|r| serde_json::from_str(r).ok())
            .collect();
        messages.reverse();
        Ok(messages)
    }

    pub async fn len(&self, queue: &str) -> anyhow::Result<u64> {
        Ok(self.store.list_len(queue).await?)
    }

    /// Drops every pending message in `queue`. An administrative escape
    /// hatch, not part of the C5 contract proper.
    pub async fn clear(&self, queue: &str) -> anyhow::Result<bool> {
        Ok(self.store.del(queue).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordination::CoordResult;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct FakeStore {
        lists: Mutex<std::collections::HashMap<String, VecDeque<String>>>,
    }

    #[async_trait]
    impl CoordinationStore for FakeStore {
        async fn set_if_absent(&self, _key: &str, _value: &str, _ttl: Duration) -> CoordResult<bool> {
            Ok(true)
        }
        async fn get(&self, _key: &str) -> CoordResult<Option<String>> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> CoordResult<()> {
            Ok(())
        }
        async fn del(&self, _key: &str) -> CoordResult<bool> {
            Ok(false)
        }
        async fn exists(&self, _key: &str) -> CoordResult<bool> {
            Ok(false)
        }
        async fn scan_delete(&self, _pattern: &str) -> CoordResult<u64> {
            Ok(0)
        }
        async fn list_push_left(&self, queue: &str, value: &str) -> CoordResult<()> {
            self.lists.lock().entry(queue.to_string()).or_default().push_front(value.to_string());
            Ok(())
        }
        async fn list_pop_right_blocking(&self, queue: &str, _timeout: Duration) -> CoordResult<Option<String>> {
            Ok(self.lists.lock().get_mut(queue).and_then(|q| q.pop_back()))
        }
        async fn list_pop_right_nonblocking(&self, queue: &str) -> CoordResult<Option<String>> {
            Ok(self.lists.lock().get_mut(queue).and_then(|q| q.pop_back()))
        }
        async fn list_range(&self, queue: &str) -> CoordResult<Vec<String>> {
            Ok(self.lists.lock().get(queue).map(|q| q.iter().cloned().collect()).unwrap_or_default())
        }
        async fn list_len(&self, queue: &str) -> CoordResult<u64> {
            Ok(self.lists.lock().get(queue).map(|q| q.len() as u64).unwrap_or(0))
        }
    }

    #[tokio::test]
    async fn preserves_fifo_order() {
        let store = Arc::new(FakeStore::default());
        let queue = WorkQueue::new(store);

        queue.enqueue(CARD_OPERATIONS, QueueMessage::new("CARD_CREATED", serde_json::json!({"name": "A"}))).await.unwrap();
        queue.enqueue(CARD_OPERATIONS, QueueMessage::new("CARD_CREATED", serde_json::json!({"name": "B"}))).await.unwrap();

        let first = queue.dequeue_nonblocking(CARD_OPERATIONS).await.unwrap().unwrap();
        let second = queue.dequeue_nonblocking(CARD_OPERATIONS).await.unwrap().unwrap();

        assert_eq!(first.payload["name"], "A");
        assert_eq!(second.payload["name"], "B");
        assert!(queue.dequeue_nonblocking(CARD_OPERATIONS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn peek_does_not_consume() {
        let store = Arc::new(FakeStore::default());
        let queue = WorkQueue::new(store);

        queue.enqueue(NOTIFICATIONS, QueueMessage::new("SYSTEM", serde_json::json!({}))).await.unwrap();
        let snapshot = queue.peek(NOTIFICATIONS).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(queue.len(NOTIFICATIONS).await.unwrap(), 1);
    }
}
