//! Redis-backed FIFO broker adapter.
//!
//! A thin wrapper around a single Redis list: `LPUSH` to enqueue, blocking
//! `BRPOP` to dequeue. This generalizes the `redis` client dependency the
//! ingestion surface already carries for its own bookkeeping into a full
//! FIFO broker client (spec §4.4).

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::BrokerError;

/// Default queue name, matching the original system's fixed single queue.
pub const DEFAULT_QUEUE_NAME: &str = "events_queue";

/// A FIFO broker queue backed by a Redis list.
#[derive(Clone)]
pub struct BrokerQueue {
    conn: MultiplexedConnection,
    queue_name: String,
}

impl BrokerQueue {
    /// Connect to Redis at `redis_url` and bind to the default queue name.
    pub async fn connect(redis_url: &str) -> Result<Self, BrokerError> {
        Self::connect_named(redis_url, DEFAULT_QUEUE_NAME).await
    }

    /// Connect to Redis at `redis_url`, bound to a specific queue name.
    pub async fn connect_named(redis_url: &str, queue_name: &str) -> Result<Self, BrokerError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        Ok(Self {
            conn,
            queue_name: queue_name.to_string(),
        })
    }

    /// Append `bytes` to the tail of the queue.
    pub async fn push(&self, bytes: &[u8]) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(&self.queue_name, bytes).await?;
        Ok(())
    }

    /// Blocking remove-from-head with a timeout. Returns `None` on timeout
    /// so callers (workers) can poll their cancellation signal.
    pub async fn pop(&self, timeout: Duration) -> Result<Option<Vec<u8>>, BrokerError> {
        let mut conn = self.conn.clone();
        let result: Option<(String, Vec<u8>)> =
            conn.blpop(&self.queue_name, timeout.as_secs_f64()).await?;
        Ok(result.map(|(_, value)| value))
    }
}
