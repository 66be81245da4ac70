//! API integration tests against a live Postgres + Redis instance.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use log_aggregator::api;
use log_aggregator::broker::BrokerQueue;
use log_aggregator::state::AppState;
use log_aggregator::store::Store;

mod common;

async fn build_test_app() -> (axum::Router, Store, BrokerQueue) {
    let pool = common::setup_test_db().await;
    let store = Store::from_pool(pool);

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let broker = BrokerQueue::connect_named(&redis_url, "test_events_queue")
        .await
        .expect("Failed to connect to Redis");

    // drain any leftovers from a previous run
    while broker.pop(std::time::Duration::from_millis(10)).await.unwrap().is_some() {}

    let state = AppState::new(store.clone(), broker.clone());
    let app = api::create_router().with_state(state);

    (app, store, broker)
}

fn sample_event(topic: &str, event_id: &str) -> Value {
    json!({
        "topic": topic,
        "event_id": event_id,
        "timestamp": "2026-01-15T10:00:00Z",
        "source": "integration-test",
        "payload": {"k": "v"},
    })
}

#[tokio::test]
async fn publish_enqueues_and_worker_commit_round_trips() {
    let (app, store, broker) = build_test_app().await;

    let req = Request::builder()
        .method("POST")
        .uri("/publish")
        .header("content-type", "application/json")
        .body(Body::from(sample_event("user.login", "evt-1").to_string()))
        .unwrap();

    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["event_id"], "evt-1");
    assert_eq!(json["success"], true);

    let bytes = broker
        .pop(std::time::Duration::from_secs(2))
        .await
        .unwrap()
        .expect("event should be on the queue");
    let event = log_aggregator::event::Event::deserialize(&bytes).unwrap();
    assert_eq!(event.event_id, "evt-1");

    let outcome = store.commit(&event).await.unwrap();
    assert_eq!(outcome.as_str(), "new");
}

#[tokio::test]
async fn publish_rejects_invalid_event() {
    let (app, _store, _broker) = build_test_app().await;

    let req = Request::builder()
        .method("POST")
        .uri("/publish")
        .header("content-type", "application/json")
        .body(Body::from(sample_event("", "evt-2").to_string()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn publish_batch_is_best_effort() {
    let (app, _store, _broker) = build_test_app().await;

    let body = json!({
        "events": [
            sample_event("order.created", "b-1"),
            sample_event("", "b-2"),
            sample_event("order.created", "b-3"),
        ]
    });

    let req = Request::builder()
        .method("POST")
        .uri("/publish/batch")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["total"], 3);
    assert_eq!(json["success"], 2);
    assert_eq!(json["failed"], 1);
}

#[tokio::test]
async fn publish_batch_rejects_empty_and_oversized() {
    let (app, _store, _broker) = build_test_app().await;

    let req = Request::builder()
        .method("POST")
        .uri("/publish/batch")
        .header("content-type", "application/json")
        .body(Body::from(json!({"events": []}).to_string()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_and_events_reflect_committed_state() {
    let (app, store, _broker) = build_test_app().await;

    let event = log_aggregator::event::Event::validate(log_aggregator::event::RawEvent {
        topic: "t".to_string(),
        event_id: "e1".to_string(),
        timestamp: "2026-01-15T10:00:00Z".to_string(),
        source: "svc".to_string(),
        payload: json!({}),
    })
    .unwrap();

    store.commit(&event).await.unwrap();
    store.commit(&event).await.unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/stats")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["received_total"], 2);
    assert_eq!(json["unique_processed"], 1);
    assert_eq!(json["duplicate_dropped"], 1);

    let req = Request::builder()
        .method("GET")
        .uri("/events?topic=t")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["events"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn health_reports_ok_when_store_reachable() {
    let pool = common::setup_test_db().await;
    let store = Store::from_pool(pool);
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let broker = BrokerQueue::connect_named(&redis_url, "test_events_queue_health")
        .await
        .unwrap();
    let state = AppState::new(store, broker);

    let app = axum::Router::new()
        .route("/health", axum::routing::get(api::routes::health_check))
        .with_state(state);

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
