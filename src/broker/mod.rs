//! Broker queue adapter
//!
//! FIFO single queue between publishers and workers (spec §4.4).

mod error;
mod queue;

pub use error::BrokerError;
pub use queue::{BrokerQueue, DEFAULT_QUEUE_NAME};
