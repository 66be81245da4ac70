//! End-to-end scenarios for the idempotent commit protocol against a live
//! Postgres instance.

use chrono::Utc;
use serde_json::json;

use log_aggregator::event::{Event, RawEvent};
use log_aggregator::store::{CommitOutcome, Store};

mod common;

fn event(topic: &str, event_id: &str, payload: serde_json::Value) -> Event {
    Event::validate(RawEvent {
        topic: topic.to_string(),
        event_id: event_id.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        source: "test".to_string(),
        payload,
    })
    .unwrap()
}

async fn store() -> Store {
    let pool = common::setup_test_db().await;
    Store::from_pool(pool)
}

#[tokio::test]
async fn single_duplicate_is_counted_once() {
    let store = store().await;
    let e = event("t", "e1", json!({}));

    let first = store.commit(&e).await.unwrap();
    let second = store.commit(&e).await.unwrap();

    assert_eq!(first, CommitOutcome::New);
    assert_eq!(second, CommitOutcome::Duplicate);

    let stats = store.read_stats().await.unwrap();
    assert_eq!(stats.received_count, 2);
    assert_eq!(stats.unique_processed_count, 1);
    assert_eq!(stats.duplicate_dropped_count, 1);

    let events = store.query_events(Some("t"), 10).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn concurrent_commits_of_same_key_yield_exactly_one_new() {
    let store = store().await;
    let e = event("t", "c1", json!({}));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        let e = e.clone();
        handles.push(tokio::spawn(async move { store.commit(&e).await.unwrap() }));
    }

    let mut new_count = 0;
    let mut duplicate_count = 0;
    for handle in handles {
        match handle.await.unwrap() {
            CommitOutcome::New => new_count += 1,
            CommitOutcome::Duplicate => duplicate_count += 1,
        }
    }

    assert_eq!(new_count, 1);
    assert_eq!(duplicate_count, 9);

    let events = store.query_events(Some("t"), 100).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn shared_event_id_across_topics_is_distinct() {
    let store = store().await;

    let a = store.commit(&event("a", "s", json!({}))).await.unwrap();
    let b = store.commit(&event("b", "s", json!({}))).await.unwrap();

    assert_eq!(a, CommitOutcome::New);
    assert_eq!(b, CommitOutcome::New);

    let events = store.query_events(None, 100).await.unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn mixed_load_reconciles_counters() {
    let store = store().await;

    let unique_events: Vec<Event> = (0..30)
        .map(|i| event("mixed", &format!("u{}", i), json!({"i": i})))
        .collect();

    let mut all = unique_events.clone();
    for i in 0..20 {
        all.push(unique_events[i % unique_events.len()].clone());
    }

    let mut handles = Vec::new();
    for e in all {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.commit(&e).await.unwrap() }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = store.read_stats().await.unwrap();
    assert_eq!(stats.unique_processed_count, 30);
    assert_eq!(stats.duplicate_dropped_count, 20);
    assert_eq!(stats.received_count, 50);

    let events = store.query_events(Some("mixed"), 1000).await.unwrap();
    assert_eq!(events.len(), 30);
}

#[tokio::test]
async fn commit_persists_across_pool_reopen() {
    let pool = common::setup_test_db().await;
    let database_url = std::env::var("DATABASE_URL").unwrap();

    let store = Store::from_pool(pool);
    let e = event("p", "r1", json!({}));
    let first = store.commit(&e).await.unwrap();
    store.close().await;

    let reopened = Store::connect(&database_url, 5).await.unwrap();
    let second = reopened.commit(&e).await.unwrap();

    assert_eq!(first, CommitOutcome::New);
    assert_eq!(second, CommitOutcome::Duplicate);

    let events = reopened.query_events(Some("p"), 10).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn duplicate_commit_does_not_overwrite_payload() {
    let store = store().await;

    store
        .commit(&event("t", "pl", json!({"v": 1})))
        .await
        .unwrap();
    let second = store
        .commit(&event("t", "pl", json!({"v": 2})))
        .await
        .unwrap();

    assert_eq!(second, CommitOutcome::Duplicate);

    let events = store.query_events(Some("t"), 10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload, json!({"v": 1}));
}
