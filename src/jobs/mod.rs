//! Scheduled jobs
//!
//! A single background job that periodically logs a stats snapshot. It is
//! read-only: it never touches `processed_events` or the counters the
//! ingestion path owns, so it cannot interfere with the commit protocol.

use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::store::Store;

/// Configuration for the job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval between stats snapshots (default: 1 minute)
    pub stats_snapshot_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            stats_snapshot_interval: Duration::from_secs(60),
        }
    }
}

/// Job scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    store: Store,
    config: JobSchedulerConfig,
    cancel: CancellationToken,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(store: Store, cancel: CancellationToken) -> Self {
        Self {
            store,
            config: JobSchedulerConfig::default(),
            cancel,
        }
    }

    /// Create with custom configuration
    pub fn with_config(store: Store, cancel: CancellationToken, config: JobSchedulerConfig) -> Self {
        Self {
            store,
            config,
            cancel,
        }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be awaited on shutdown
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop until cancelled
    async fn run(&self) {
        tracing::info!("job_scheduler_started");

        let mut stats_interval = interval(self.config.stats_snapshot_interval);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = stats_interval.tick() => {
                    if let Err(e) = log_stats_snapshot(&self.store).await {
                        tracing::error!(error = %e, "stats_snapshot_failed");
                    }
                }
            }
        }

        tracing::info!("job_scheduler_stopped");
    }

    /// Run the maintenance task once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match self.store.read_stats().await {
            Ok(stats) => report.stats = Some(stats),
            Err(e) => report.errors.push(format!("stats snapshot: {}", e)),
        }

        report
    }
}

async fn log_stats_snapshot(store: &Store) -> Result<(), JobError> {
    let stats = store.read_stats().await?;

    tracing::info!(
        received_count = stats.received_count,
        unique_processed_count = stats.unique_processed_count,
        duplicate_dropped_count = stats.duplicate_dropped_count,
        active_topics = stats.active_topics,
        "stats_snapshot"
    );

    Ok(())
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub stats: Option<crate::store::Stats>,
    pub errors: Vec<String>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_scheduler_config_default() {
        let config = JobSchedulerConfig::default();
        assert_eq!(config.stats_snapshot_interval, Duration::from_secs(60));
    }

    #[test]
    fn maintenance_report_default_has_no_errors() {
        let report = MaintenanceReport::default();
        assert!(report.stats.is_none());
        assert!(report.errors.is_empty());
    }
}
