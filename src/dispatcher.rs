//! C6 — Background dispatcher.
//!
//! Runs every 5 seconds, one pass per known queue, non-blocking pops
//! bounded to 10 per cycle. A handler failure aborts the rest of that
//! queue's cycle (to avoid cascading through a run of bad messages) but
//! other queues still run. Mirrors the teacher's `webhook_dispatcher.rs`
//! interval-loop shape.

use crate::cache::CacheNamespace;
use crate::queue::{QueueMessage, WorkQueue, CACHE_OPERATIONS, CARD_OPERATIONS, NOTIFICATIONS};
use std::sync::Arc;
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_secs(5);
const MAX_BATCH: usize = 10;
const KNOWN_QUEUES: [&str; 3] = [CARD_OPERATIONS, CACHE_OPERATIONS, NOTIFICATIONS];

pub struct Dispatcher {
    queue: Arc<WorkQueue>,
    cache: Arc<CacheNamespace>,
}

impl Dispatcher {
    pub fn new(queue: Arc<WorkQueue>, cache: Arc<CacheNamespace>) -> Self {
        Self { queue, cache }
    }

    /// Spawns the periodic drain loop. Never returns; intended to be
    /// spawned once per replica at startup.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            interval.tick().await;
            for queue_name in KNOWN_QUEUES {
                self.drain_queue(queue_name).await;
            }
        }
    }

    async fn drain_queue(&self, queue_name: &str) {
        for _ in 0..MAX_BATCH {
            let message = match self.queue.dequeue_nonblocking(queue_name).await {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("failed to pop from {queue_name}: {e}");
                    break;
                }
            };

            if let Err(e) = self.handle(&message).await {
                tracing::error!("handler failed for {queue_name} message {:?}: {e}", message.message_type);
                break;
            }
        }
    }

    async fn handle(&self, message: &QueueMessage) -> anyhow::Result<()> {
        match message.message_type.as_str() {
            "CARD_CREATED" | "CARD_UPDATED" | "CARD_DELETED" => {
                tracing::info!(kind = %message.message_type, payload = %message.payload, "post-mutation hook");
                Ok(())
            }
            "CLEAR_ALL" => {
                self.cache.evict_all().await?;
                Ok(())
            }
            "EMAIL" | "SYSTEM" => {
                tracing::info!(kind = %message.message_type, payload = %message.payload, "notification dispatched");
                Ok(())
            }
            other => {
                tracing::warn!("unknown message type {other}, dropping");
                Ok(())
            }
        }
    }
}
