//! Process-wide application state
//!
//! Threaded through axum's `State` extractor on the HTTP side and cloned
//! into each worker task on the consumer side (spec §9).

use chrono::{DateTime, Utc};

use crate::broker::BrokerQueue;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub broker: BrokerQueue,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Store, broker: BrokerQueue) -> Self {
        Self {
            store,
            broker,
            started_at: Utc::now(),
        }
    }
}
