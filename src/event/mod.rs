//! Event model
//!
//! Shape, validation, and normalization of ingested events.

mod model;

pub use model::{Event, ParseError, RawEvent, ValidationError};
