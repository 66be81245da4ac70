//! Durable store
//!
//! Events table, deduplication table, atomic counters table, and the
//! idempotent commit protocol that keeps them consistent (spec §4.2, §4.3).

mod error;
mod repository;

pub use error::StoreError;
pub use repository::{CommitOutcome, Stats, Store, StoredEvent};
