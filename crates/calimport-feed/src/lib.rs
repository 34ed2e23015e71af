//! Calendar feed import pipeline.
//!
//! This crate turns an ICS feed into normalized events:
//!
//! - [`RawComponent`] - The seam between the feed parser and the pipeline
//! - [`extract`] - Flattens a component into a [`FlatRecord`]
//! - [`EventSchema`] - Validates a record into a `ValidatedEvent`
//! - [`Pipeline`] - Runs every component and partitions the results
//! - [`to_transport`] / `ExportClient` - Hands accepted events to the events API
//! - [`FeedError`] - Whole-run failures (fetch, parse, export)
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────┐
//!  │  FeedClient  │  (http feature)
//!  └──────┬───────┘
//!         │ ICS text
//!         ▼
//!  ┌──────────────┐
//!  │parse_calendar│
//!  └──────┬───────┘
//!         │ RawComponent
//!         ▼
//!  ┌──────────────┐     ┌─────────────┐
//!  │   extract    │────▶│   broken    │
//!  └──────┬───────┘     └─────────────┘
//!         │ FlatRecord
//!         ▼
//!  ┌──────────────┐     ┌─────────────┐
//!  │ EventSchema  │────▶│  unparsed   │
//!  └──────┬───────┘     └─────────────┘
//!         │ ValidatedEvent
//!         ▼ dates, cutoff, location
//!  ┌──────────────────┐
//!  │ NormalizedEvent  │──▶ to_transport() ──▶ ExportClient
//!  └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use calimport_feed::{Pipeline, process_feed};
//!
//! let outcome = process_feed(&ics, &Pipeline::default(), None).expect("feed parses");
//! println!("{}", serde_json::to_string(&outcome.export_payload())?);
//! ```

pub mod component;
pub mod error;
pub mod export;
pub mod extract;
#[cfg(feature = "http")]
pub mod fetch;
pub mod ics;
pub mod pipeline;
pub mod validate;

// Re-export main types at crate root
pub use component::{
    DateValue, FlatRecord, FlatValue, PropertyError, RawComponent, RecurValue, TimeOfDay,
};
pub use error::{FeedError, FeedErrorCode, FeedResult};
#[cfg(feature = "http")]
pub use export::ExportClient;
pub use export::{ExportConfig, Reservation, TransportRecord, to_transport};
pub use extract::{ExtractionError, extract};
#[cfg(feature = "http")]
pub use fetch::{FeedClient, FeedConfig};
pub use ics::parse_calendar;
pub use pipeline::{ExportPayload, ImportOutcome, Pipeline, UnparsedRecord, process_feed};
pub use validate::{EventSchema, FieldError, FieldErrorKind, ValidationError};
