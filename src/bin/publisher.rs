//! Synthetic load generator
//!
//! Pushes a mix of unique and duplicate events directly onto the broker
//! queue, at a configurable rate, to exercise the idempotent commit
//! protocol under load. Not part of the ingestion API path; this talks to
//! the broker directly, the way a trusted internal producer would.

use std::time::Duration;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;

use log_aggregator::broker::BrokerQueue;
use log_aggregator::event::{Event, RawEvent};

const TOPICS: &[&str] = &[
    "user.login",
    "user.logout",
    "user.register",
    "order.created",
    "order.completed",
    "order.cancelled",
    "payment.success",
    "payment.failed",
    "inventory.updated",
    "notification.sent",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let total_events: usize = std::env::var("TOTAL_EVENTS")
        .unwrap_or_else(|_| "20000".to_string())
        .parse()?;
    let duplicate_rate: f64 = std::env::var("DUPLICATE_RATE")
        .unwrap_or_else(|_| "0.35".to_string())
        .parse()?;
    let send_rate: u32 = std::env::var("SEND_RATE")
        .unwrap_or_else(|_| "100".to_string())
        .parse()?;

    tracing::info!(
        total_events,
        duplicate_rate,
        send_rate,
        "publisher_starting"
    );

    let broker = BrokerQueue::connect(&redis_url).await?;
    tracing::info!("broker_connected");

    let unique_count = ((total_events as f64) * (1.0 - duplicate_rate)) as usize;
    let duplicate_count = total_events - unique_count;

    tracing::info!(unique = unique_count, duplicates = duplicate_count, "event_plan");

    let mut rng = rand::thread_rng();

    let unique_events: Vec<RawEvent> = (0..unique_count).map(|_| generate_event(&mut rng, None)).collect();
    tracing::info!(count = unique_events.len(), "unique_events_generated");

    let mut duplicate_events = Vec::with_capacity(duplicate_count);
    for _ in 0..duplicate_count {
        let original = unique_events
            .choose(&mut rng)
            .expect("unique_events is non-empty when duplicate_rate < 1.0");
        let mut duplicate = generate_event(&mut rng, Some(original.event_id.clone()));
        duplicate.topic = original.topic.clone();
        duplicate_events.push(duplicate);
    }
    tracing::info!(count = duplicate_events.len(), "duplicate_events_generated");

    let mut all_events: Vec<RawEvent> = unique_events.into_iter().chain(duplicate_events).collect();
    all_events.shuffle(&mut rng);
    tracing::info!(total = all_events.len(), "events_shuffled");

    let delay = if send_rate > 0 {
        Some(Duration::from_secs_f64(1.0 / send_rate as f64))
    } else {
        None
    };

    let start = std::time::Instant::now();
    let mut sent_count = 0usize;

    for raw in all_events {
        let event = Event::validate(raw)?;
        broker.push(&event.serialize()).await?;
        sent_count += 1;

        if sent_count % 1000 == 0 {
            let elapsed = start.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                sent_count as f64 / elapsed
            } else {
                0.0
            };
            tracing::info!(sent = sent_count, total_events, rate_per_sec = rate, "progress");
        }

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    let actual_rate = if elapsed > 0.0 {
        sent_count as f64 / elapsed
    } else {
        0.0
    };

    tracing::info!(
        total_sent = sent_count,
        duration_seconds = elapsed,
        avg_rate_per_sec = actual_rate,
        unique = unique_count,
        duplicates = duplicate_count,
        "publishing_complete"
    );

    Ok(())
}

fn generate_event(rng: &mut impl Rng, event_id: Option<String>) -> RawEvent {
    let topic = TOPICS.choose(rng).unwrap().to_string();
    let event_id = event_id.unwrap_or_else(|| generate_event_id(rng));

    let payload = if topic.starts_with("user.") {
        json!({
            "user_id": rng.gen_range(1000..10000),
            "ip": format!("{}.{}.{}.{}", rng.gen_range(1..256), rng.gen_range(1..256), rng.gen_range(1..256), rng.gen_range(1..256)),
            "user_agent": ["Chrome/91.0", "Firefox/89.0", "Safari/14.1"].choose(rng).unwrap(),
        })
    } else if topic.starts_with("order.") {
        json!({
            "order_id": format!("ORD-{}", rng.gen_range(10000..100000)),
            "user_id": rng.gen_range(1000..10000),
            "amount": (rng.gen_range(1000..100000) as f64) / 100.0,
            "items": rng.gen_range(1..11),
        })
    } else if topic.starts_with("payment.") {
        json!({
            "transaction_id": format!("TXN-{}", rng.gen_range(10000..100000)),
            "amount": (rng.gen_range(1000..100000) as f64) / 100.0,
            "method": ["credit_card", "debit_card", "paypal", "bank_transfer"].choose(rng).unwrap(),
        })
    } else if topic.starts_with("inventory.") {
        json!({
            "product_id": format!("PROD-{}", rng.gen_range(100..1000)),
            "quantity": rng.gen_range(-10..101),
            "warehouse": ["WH-A", "WH-B", "WH-C"].choose(rng).unwrap(),
        })
    } else {
        json!({
            "message": ["Order shipped", "Account verified", "Password changed"].choose(rng).unwrap(),
            "priority": ["low", "medium", "high"].choose(rng).unwrap(),
        })
    };

    RawEvent {
        topic,
        event_id,
        timestamp: Utc::now().to_rfc3339(),
        source: "publisher-service".to_string(),
        payload,
    }
}

fn generate_event_id(rng: &mut impl Rng) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix: String = (0..8)
        .map(|_| {
            let choices = b"abcdefghijklmnopqrstuvwxyz0123456789";
            choices[rng.gen_range(0..choices.len())] as char
        })
        .collect();
    format!("evt_{}_{}", timestamp, suffix)
}
