//! C1 — Coordination client.
//!
//! Thin async-trait adapter over the in-memory coordination store
//! (Redis in production). Every operation is expected to be atomic on
//! the backing store; no ordering is assumed across different keys.
//! Operations fail with [`CoordinationError`] — callers decide whether
//! to fail open or fail closed (see [`crate::lock`], [`crate::cache`]).

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub struct CoordinationError(pub String);

impl fmt::Display for CoordinationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "coordination store error: {}", self.0)
    }
}

impl std::error::Error for CoordinationError {}

impl From<redis::RedisError> for CoordinationError {
    fn from(err: redis::RedisError) -> Self {
        Self(err.to_string())
    }
}

pub type CoordResult<T> = Result<T, CoordinationError>;

/// Capability set required by C2-C6. Named after the spec's §4.1
/// operation list so call sites read the same as the design doc.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CoordResult<bool>;
    async fn get(&self, key: &str) -> CoordResult<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CoordResult<()>;
    async fn del(&self, key: &str) -> CoordResult<bool>;
    async fn exists(&self, key: &str) -> CoordResult<bool>;
    async fn scan_delete(&self, pattern: &str) -> CoordResult<u64>;

    async fn list_push_left(&self, queue: &str, value: &str) -> CoordResult<()>;
    async fn list_pop_right_blocking(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> CoordResult<Option<String>>;
    async fn list_pop_right_nonblocking(&self, queue: &str) -> CoordResult<Option<String>>;
    async fn list_range(&self, queue: &str) -> CoordResult<Vec<String>>;
    async fn list_len(&self, queue: &str) -> CoordResult<u64>;
}

/// Redis-backed implementation. Connections are pooled by the
/// `ConnectionManager`, which also transparently reconnects, matching
/// the teacher's `MultiplexedConnection` usage in `auth.rs`/`rate_limit.rs`
/// but with built-in retry instead of the teacher's hand-rolled
/// reconnect-on-`None` logic.
#[derive(Clone)]
pub struct RedisCoordinationStore {
    conn: ConnectionManager,
}

impl RedisCoordinationStore {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CoordinationStore for RedisCoordinationStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CoordResult<bool> {
        let mut conn = self.conn.clone();
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        Ok(result.is_some())
    }

    async fn get(&self, key: &str) -> CoordResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CoordResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> CoordResult<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> CoordResult<bool> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(key).await?)
    }

    async fn scan_delete(&self, pattern: &str) -> CoordResult<u64> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: u64 = conn.del(&keys).await?;
        Ok(removed)
    }

    async fn list_push_left(&self, queue: &str, value: &str) -> CoordResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(queue, value).await?;
        Ok(())
    }

    async fn list_pop_right_blocking(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> CoordResult<Option<String>> {
        let mut conn = self.conn.clone();
        let result: Option<(String, String)> =
            conn.brpop(queue, timeout.as_secs_f64()).await?;
        Ok(result.map(|(_, value)| value))
    }

    async fn list_pop_right_nonblocking(&self, queue: &str) -> CoordResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.rpop(queue, None).await?)
    }

    async fn list_range(&self, queue: &str) -> CoordResult<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.lrange(queue, 0, -1).await?)
    }

    async fn list_len(&self, queue: &str) -> CoordResult<u64> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(queue).await?)
    }
}
