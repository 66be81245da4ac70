//! API Routes
//!
//! HTTP endpoint definitions: publish, publish/batch, events, stats, health.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::event::{Event, RawEvent};
use crate::state::AppState;
use crate::store::StoredEvent;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub event_id: String,
    pub status: String,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct PublishBatchRequest {
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Serialize)]
pub struct BatchItemResult {
    pub event_id: String,
    pub status: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublishBatchResponse {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub topic: String,
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl From<StoredEvent> for EventResponse {
    fn from(e: StoredEvent) -> Self {
        Self {
            topic: e.topic,
            event_id: e.event_id,
            timestamp: e.timestamp,
            source: e.source,
            payload: e.payload,
            received_at: e.received_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventsListResponse {
    pub events: Vec<EventResponse>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub received_total: i64,
    pub unique_processed: i64,
    pub duplicate_dropped: i64,
    pub active_topics: i64,
    pub uptime_seconds: i64,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

// =========================================================================
// Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/publish", post(publish))
        .route("/publish/batch", post(publish_batch))
        .route("/events", get(get_events))
        .route("/stats", get(get_stats))
}

// =========================================================================
// POST /publish
// =========================================================================

async fn publish(
    State(state): State<AppState>,
    Json(raw): Json<RawEvent>,
) -> Result<Json<PublishResponse>, AppError> {
    let event = Event::validate(raw)?;
    let event_id = event.event_id.clone();

    state.broker.push(&event.serialize()).await?;

    Ok(Json(PublishResponse {
        event_id,
        status: "queued".to_string(),
        success: true,
    }))
}

// =========================================================================
// POST /publish/batch
// =========================================================================

const MAX_BATCH_SIZE: usize = 1000;

async fn publish_batch(
    State(state): State<AppState>,
    Json(request): Json<PublishBatchRequest>,
) -> Result<Json<PublishBatchResponse>, AppError> {
    if request.events.is_empty() || request.events.len() > MAX_BATCH_SIZE {
        return Err(AppError::InvalidRequest(format!(
            "batch size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE,
            request.events.len()
        )));
    }

    let mut results = Vec::with_capacity(request.events.len());
    let mut success = 0usize;

    for raw in request.events {
        let event_id_hint = raw.event_id.clone();

        let result = match Event::validate(raw) {
            Ok(event) => {
                let event_id = event.event_id.clone();
                match state.broker.push(&event.serialize()).await {
                    Ok(()) => BatchItemResult {
                        event_id,
                        status: "queued".to_string(),
                        success: true,
                        error: None,
                    },
                    Err(e) => BatchItemResult {
                        event_id,
                        status: "failed".to_string(),
                        success: false,
                        error: Some(e.to_string()),
                    },
                }
            }
            Err(e) => BatchItemResult {
                event_id: event_id_hint,
                status: "rejected".to_string(),
                success: false,
                error: Some(e.to_string()),
            },
        };

        if result.success {
            success += 1;
        }
        results.push(result);
    }

    let total = results.len();
    let failed = total - success;

    Ok(Json(PublishBatchResponse {
        total,
        success,
        failed,
        results,
    }))
}

// =========================================================================
// GET /events
// =========================================================================

const MAX_QUERY_LIMIT: i64 = 1000;

async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsListResponse>, AppError> {
    if query.limit < 1 || query.limit > MAX_QUERY_LIMIT {
        return Err(AppError::InvalidRequest(format!(
            "limit must be between 1 and {}, got {}",
            MAX_QUERY_LIMIT, query.limit
        )));
    }

    let events = state
        .store
        .query_events(query.topic.as_deref(), query.limit)
        .await?;

    Ok(Json(EventsListResponse {
        events: events.into_iter().map(EventResponse::from).collect(),
    }))
}

// =========================================================================
// GET /stats
// =========================================================================

async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.store.read_stats().await?;
    let uptime_seconds = (Utc::now() - state.started_at).num_seconds().max(0);

    Ok(Json(StatsResponse {
        received_total: stats.received_count,
        unique_processed: stats.unique_processed_count,
        duplicate_dropped: stats.duplicate_dropped_count,
        active_topics: stats.active_topics,
        uptime_seconds,
        started_at: stats.started_at,
        last_updated: stats.last_updated,
    }))
}

// =========================================================================
// GET /health
// =========================================================================

pub async fn health_check(State(state): State<AppState>) -> StatusCode {
    if state.store.ping().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_is_100() {
        assert_eq!(default_limit(), 100);
    }

    #[test]
    fn batch_result_serializes_without_error_field_when_none() {
        let result = BatchItemResult {
            event_id: "e1".to_string(),
            status: "queued".to_string(),
            success: true,
            error: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("error"));
    }
}
