//! Event model
//!
//! The `Event` type is the unit the whole pipeline moves: validated and
//! normalized once at the ingestion boundary, then serialized onto the
//! broker queue and deserialized by a worker without re-validation.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum length, in characters, allowed for `topic`, `event_id`, and `source`.
const MAX_FIELD_LEN: usize = 255;

/// A single log/event record, validated and normalized.
///
/// `(topic, event_id)` is the deduplication key used by the store; `payload`
/// is opaque and never inspected for dedup purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub payload: Value,
}

/// Event payload exactly as received over the wire, before validation.
///
/// `timestamp` is kept as a raw string rather than `DateTime<Utc>` so that
/// naive (offset-less) timestamps can be accepted and interpreted as UTC --
/// chrono's own `DateTime<Utc>` deserialization rejects those outright.
#[derive(Debug, Deserialize)]
pub struct RawEvent {
    pub topic: String,
    pub event_id: String,
    pub timestamp: String,
    pub source: String,
    pub payload: Value,
}

/// Errors produced while validating a `RawEvent`.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} exceeds {MAX_FIELD_LEN} characters")]
    TooLong { field: &'static str },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("payload must be a JSON object")]
    InvalidPayload,
}

/// Errors produced while deserializing an `Event` from queued bytes.
#[derive(Debug, thiserror::Error)]
#[error("failed to parse event: {0}")]
pub struct ParseError(#[from] serde_json::Error);

impl Event {
    /// Validate and normalize a raw, wire-format event.
    ///
    /// Whitespace is stripped from `topic`, `event_id`, and `source` before
    /// the length check runs, matching the order the original validators
    /// ran in.
    pub fn validate(raw: RawEvent) -> Result<Self, ValidationError> {
        let topic = normalize_field(raw.topic, "topic")?;
        let event_id = normalize_field(raw.event_id, "event_id")?;
        let source = normalize_field(raw.source, "source")?;
        let timestamp = parse_timestamp(&raw.timestamp)?;

        if !raw.payload.is_object() {
            return Err(ValidationError::InvalidPayload);
        }

        Ok(Self {
            topic,
            event_id,
            timestamp,
            source,
            payload: raw.payload,
        })
    }

    /// Serialize this event to its canonical wire/queue representation.
    pub fn serialize(&self) -> Vec<u8> {
        // `Event` derives `Serialize`/`Deserialize` with the same field set,
        // so this is always round-trippable by `deserialize`.
        serde_json::to_vec(self).expect("Event serialization is infallible")
    }

    /// Deserialize an `Event` from bytes previously produced by `serialize`.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ParseError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

fn normalize_field(raw: String, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = raw.trim().to_string();

    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }

    if trimmed.chars().count() > MAX_FIELD_LEN {
        return Err(ValidationError::TooLong { field });
    }

    Ok(trimmed)
}

/// Parse an ISO-8601 timestamp, accepting `Z`, explicit offsets, and naive
/// (offset-less) forms. Naive inputs are interpreted as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(ValidationError::InvalidTimestamp(raw.to_string()))
}
