//! Core types: dates, categories, events, tracing

pub mod category;
pub mod date;
pub mod event;
pub mod text;
pub mod tracing;

pub use category::{Category, Location, LocationTable, UnknownCategory};
pub use date::{CanonicalDate, DateRange, Recurrence, SemanticDate, resolve_date, resolve_range};
pub use event::{NormalizedEvent, ValidatedEvent};
pub use text::repair_text;
pub use crate::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
