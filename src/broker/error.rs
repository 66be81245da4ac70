//! Broker error type.

/// Errors produced by the broker queue adapter.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker error: {0}")]
    Redis(#[from] redis::RedisError),
}
