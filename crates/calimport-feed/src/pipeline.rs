//! The import pipeline.
//!
//! [`Pipeline::run`] takes every component of a feed through
//!
//! ```text
//! RawComponent ──extract──▶ FlatRecord ──validate──▶ ValidatedEvent
//!      │                        │                         │
//!      ▼                        ▼                         ▼ resolve dates, cutoff,
//!   broken                  unparsed                        resolve location
//!                                                          │
//!                                                          ▼
//!                                                   NormalizedEvent
//! ```
//!
//! Per-record failures land in the `broken` and `unparsed` buckets and never
//! stop the run. Events ending after the cutoff are dropped without a
//! diagnostic.

use calimport_core::{LocationTable, NormalizedEvent, resolve_range};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::component::{FlatRecord, RawComponent};
use crate::extract::{ExtractionError, extract};
use crate::ics::parse_calendar;
use crate::validate::{EventSchema, ValidationError};

/// A record that was extracted but failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnparsedRecord {
    /// Position of the component in the feed, starting at 0.
    pub index: usize,
    /// The record as extracted.
    pub record: FlatRecord,
    /// Every field that failed.
    pub error: ValidationError,
}

/// The partitioned result of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    /// Normalized events, in feed order.
    pub accepted: Vec<NormalizedEvent>,
    /// Components whose properties could not be read.
    pub broken: Vec<ExtractionError>,
    /// Records that failed validation.
    pub unparsed: Vec<UnparsedRecord>,
    /// Accepted events that declare no `DTEND`.
    pub no_end_count: usize,
    /// Valid events dropped because they end after the cutoff.
    pub filtered_count: usize,
}

/// The accepted set in the shape handed to exporters: `{"events": [...]}`.
#[derive(Debug, Serialize)]
pub struct ExportPayload<'a> {
    pub events: &'a [NormalizedEvent],
}

impl ImportOutcome {
    /// Returns the accepted events wrapped for export.
    pub fn export_payload(&self) -> ExportPayload<'_> {
        ExportPayload {
            events: &self.accepted,
        }
    }

    /// Returns the number of components the run looked at.
    pub fn total(&self) -> usize {
        self.accepted.len() + self.broken.len() + self.unparsed.len() + self.filtered_count
    }
}

/// What happened to one component.
enum RecordOutcome {
    Accepted { event: NormalizedEvent, no_end: bool },
    Broken(ExtractionError),
    Unparsed(UnparsedRecord),
    Filtered,
}

/// The configured import pipeline.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    schema: EventSchema,
    locations: LocationTable,
}

impl Pipeline {
    /// Creates a pipeline with the given schema and location table.
    pub fn new(schema: EventSchema, locations: LocationTable) -> Self {
        Self { schema, locations }
    }

    /// Returns the schema.
    pub fn schema(&self) -> &EventSchema {
        &self.schema
    }

    /// Returns the location table.
    pub fn locations(&self) -> &LocationTable {
        &self.locations
    }

    /// Runs every component through the pipeline, in order.
    ///
    /// When `cutoff` is set, events whose resolved end date is after it are
    /// dropped. The result depends only on the input and the cutoff.
    pub fn run<C: RawComponent>(
        &self,
        components: &[C],
        cutoff: Option<NaiveDate>,
    ) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();

        for (index, component) in components.iter().enumerate() {
            match self.process(index, component, cutoff) {
                RecordOutcome::Accepted { event, no_end } => {
                    if no_end {
                        outcome.no_end_count += 1;
                    }
                    outcome.accepted.push(event);
                }
                RecordOutcome::Broken(error) => outcome.broken.push(error),
                RecordOutcome::Unparsed(record) => outcome.unparsed.push(record),
                RecordOutcome::Filtered => outcome.filtered_count += 1,
            }
        }

        info!(
            total = components.len(),
            accepted = outcome.accepted.len(),
            broken = outcome.broken.len(),
            unparsed = outcome.unparsed.len(),
            filtered = outcome.filtered_count,
            no_end = outcome.no_end_count,
            "Import run finished"
        );

        outcome
    }

    /// Processes a single component.
    fn process<C: RawComponent>(
        &self,
        index: usize,
        component: &C,
        cutoff: Option<NaiveDate>,
    ) -> RecordOutcome {
        let record = match extract(index, component) {
            Ok(record) => record,
            Err(error) => {
                warn!(index, error = %error.source, "Skipping broken component");
                return RecordOutcome::Broken(error);
            }
        };

        let event = match self.schema.validate(&record) {
            Ok(event) => event,
            Err(error) => {
                warn!(index, error = %error, "Skipping invalid record");
                return RecordOutcome::Unparsed(UnparsedRecord {
                    index,
                    record,
                    error,
                });
            }
        };

        let dates = resolve_range(&event.dtstart, event.recurrence.as_ref());

        if let Some(cutoff) = cutoff
            && dates.end.is_after(cutoff)
        {
            debug!(
                index,
                import_id = %event.import_id,
                end = %dates.end,
                %cutoff,
                "Event ends after cutoff"
            );
            return RecordOutcome::Filtered;
        }

        let no_end = event.has_no_end();
        let location = self.locations.resolve(event.category);
        debug!(
            index,
            import_id = %event.import_id,
            start = %dates.start,
            end = %dates.end,
            "Accepted event"
        );

        RecordOutcome::Accepted {
            event: NormalizedEvent::from_validated(event, dates, location),
            no_end,
        }
    }
}

/// Parses ICS text and runs the pipeline over its events.
///
/// Returns `None` if the text cannot be parsed at all; individual bad events
/// are reported in the outcome instead.
pub fn process_feed(
    ics: &str,
    pipeline: &Pipeline,
    cutoff: Option<NaiveDate>,
) -> Option<ImportOutcome> {
    match parse_calendar(ics) {
        Ok(events) => Some(pipeline.run(&events, cutoff)),
        Err(e) => {
            warn!(error = %e, "Failed to parse feed, aborting import");
            None
        }
    }
}
