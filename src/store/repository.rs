//! Durable store repository
//!
//! Owns the three core tables (`events`, `processed_events`, `stats`) and
//! the single transaction that realizes the idempotent commit protocol.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::event::Event;

use super::StoreError;

/// Outcome of committing a single event through the idempotent commit
/// protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// This was the first time `(topic, event_id)` was seen; a row was
    /// written to `events`.
    New,
    /// `(topic, event_id)` had already been processed; no new `events` row
    /// was written.
    Duplicate,
}

impl CommitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitOutcome::New => "new",
            CommitOutcome::Duplicate => "duplicate",
        }
    }
}

/// A row read back from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredEvent {
    pub topic: String,
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

/// The singleton `stats` row, plus the derived `active_topics` count.
#[derive(Debug, Clone)]
pub struct Stats {
    pub received_count: i64,
    pub unique_processed_count: i64,
    pub duplicate_dropped_count: i64,
    pub active_topics: i64,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// The durable store: a bounded connection pool plus the idempotent commit
/// protocol and the read-only query surface over it.
#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Open a connection pool against `database_url`, bounded to
    /// `max_connections`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an already-open pool (used by tests that share a pool across
    /// store and broker setup).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the underlying connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Connectivity check for `/health`.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    // =========================================================================
    // The idempotent commit protocol (spec §4.3)
    // =========================================================================

    /// Attempt dedup insertion, then branch into the new-event path or the
    /// duplicate path, bumping counters -- all within one transaction so
    /// I1-I5 hold at every commit boundary, including under a crash between
    /// steps.
    pub async fn commit(&self, event: &Event) -> Result<CommitOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO processed_events (topic, event_id)
            VALUES ($1, $2)
            ON CONFLICT (topic, event_id) DO NOTHING
            "#,
        )
        .bind(&event.topic)
        .bind(&event.event_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query(
                r#"
                INSERT INTO events (id, topic, event_id, timestamp, source, payload, received_at)
                VALUES ($1, $2, $3, $4, $5, $6, NOW())
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&event.topic)
            .bind(&event.event_id)
            .bind(event.timestamp)
            .bind(&event.source)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE stats
                SET received_count = received_count + 1,
                    unique_processed_count = unique_processed_count + 1,
                    last_updated = NOW()
                WHERE id = 1
                "#,
            )
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE stats
                SET received_count = received_count + 1,
                    duplicate_dropped_count = duplicate_dropped_count + 1,
                    last_updated = NOW()
                WHERE id = 1
                "#,
            )
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(if inserted {
            CommitOutcome::New
        } else {
            CommitOutcome::Duplicate
        })
    }

    // =========================================================================
    // Read-only query surface
    // =========================================================================

    /// Query stored events, optionally filtered by topic, newest first.
    pub async fn query_events(
        &self,
        topic: Option<&str>,
        limit: i64,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        let events = if let Some(topic) = topic {
            sqlx::query_as::<_, StoredEvent>(
                r#"
                SELECT topic, event_id, timestamp, source, payload, received_at
                FROM events
                WHERE topic = $1
                ORDER BY received_at DESC
                LIMIT $2
                "#,
            )
            .bind(topic)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, StoredEvent>(
                r#"
                SELECT topic, event_id, timestamp, source, payload, received_at
                FROM events
                ORDER BY received_at DESC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(events)
    }

    /// Read the singleton stats row plus the derived active-topic count.
    pub async fn read_stats(&self) -> Result<Stats, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT received_count, unique_processed_count, duplicate_dropped_count,
                   started_at, last_updated
            FROM stats
            WHERE id = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let active_topics: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT topic) FROM events")
                .fetch_one(&self.pool)
                .await?;

        Ok(Stats {
            received_count: row.try_get("received_count")?,
            unique_processed_count: row.try_get("unique_processed_count")?,
            duplicate_dropped_count: row.try_get("duplicate_dropped_count")?,
            active_topics,
            started_at: row.try_get("started_at")?,
            last_updated: row.try_get("last_updated")?,
        })
    }
}
