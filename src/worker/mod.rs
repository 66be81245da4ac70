//! Worker pool
//!
//! N parallel consumers draining the broker queue through the idempotent
//! commit protocol (spec §4.5). Workers share no in-process state;
//! coordination is entirely through the store's unique constraint and the
//! broker's atomic pop.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broker::BrokerQueue;
use crate::event::Event;
use crate::store::Store;

/// How long a single `pop` blocks before returning `None`, letting a worker
/// check its cancellation token.
const POP_TIMEOUT: Duration = Duration::from_secs(1);

/// How long a worker backs off after a transient store error.
const TRANSIENT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// A single consumer in the pool.
pub struct Worker {
    worker_id: u32,
    broker: BrokerQueue,
    store: Store,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(worker_id: u32, broker: BrokerQueue, store: Store, cancel: CancellationToken) -> Self {
        Self {
            worker_id,
            broker,
            store,
            cancel,
        }
    }

    /// Run the consume loop until cancelled.
    pub async fn run(self) {
        tracing::info!(worker_id = self.worker_id, "worker_started");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let popped = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                popped = self.broker.pop(POP_TIMEOUT) => popped,
            };

            let bytes = match popped {
                Ok(Some(bytes)) => bytes,
                Ok(None) => continue,
                Err(error) => {
                    tracing::error!(worker_id = self.worker_id, %error, "broker_pop_error");
                    tokio::time::sleep(TRANSIENT_ERROR_BACKOFF).await;
                    continue;
                }
            };

            let event = match Event::deserialize(&bytes) {
                Ok(event) => event,
                Err(error) => {
                    // The message is gone from the queue already; a poison
                    // message must never stall the pipeline.
                    tracing::error!(worker_id = self.worker_id, %error, "parse_error_dropping_message");
                    continue;
                }
            };

            match self.store.commit(&event).await {
                Ok(outcome) => {
                    tracing::info!(
                        worker_id = self.worker_id,
                        topic = %event.topic,
                        event_id = %event.event_id,
                        status = outcome.as_str(),
                        "event_committed"
                    );
                }
                Err(error) => {
                    tracing::error!(
                        worker_id = self.worker_id,
                        topic = %event.topic,
                        event_id = %event.event_id,
                        transient = error.is_transient(),
                        %error,
                        "commit_error_dropping_event"
                    );
                    // Backoff is identical either way -- operator intervention is
                    // expected to resolve a fatal error, and a fresh pop will retry
                    // the transient condition on the next message regardless.
                    tokio::time::sleep(TRANSIENT_ERROR_BACKOFF).await;
                }
            }
        }

        tracing::info!(worker_id = self.worker_id, "worker_stopped");
    }
}

/// A pool of independent workers, spawned and cancelled together by the
/// supervisor.
pub struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `num_workers` workers against the given broker and store.
    pub fn spawn(num_workers: u32, broker: BrokerQueue, store: Store) -> Self {
        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(num_workers as usize);

        for worker_id in 0..num_workers {
            let worker = Worker::new(worker_id, broker.clone(), store.clone(), cancel.clone());
            handles.push(tokio::spawn(worker.run()));
        }

        Self { cancel, handles }
    }

    /// Cancel all workers and wait for each to observe it and exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
