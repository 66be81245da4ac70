//! Store error type.

/// Errors produced by the durable store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Whether this error represents a transient condition a caller may
    /// retry after a backoff (connection reset, timeout, pool exhaustion)
    /// as opposed to a fatal one (schema mismatch, bad credentials).
    ///
    /// The worker loop backs off identically either way (see `worker`), but
    /// the distinction is surfaced for logging and for `/health`.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
        }
    }
}
