//! Event types for imported calendar entries.
//!
//! This module provides the two record types produced by the import pipeline:
//! - [`ValidatedEvent`]: a feed event that passed schema validation
//! - [`NormalizedEvent`]: the output unit, with resolved dates and location

use serde::Serialize;

use crate::category::{Category, Location};
use crate::date::{DateRange, Recurrence, SemanticDate};

/// A feed event that passed schema validation.
///
/// Field transforms have already been applied: `import_id` is the token
/// extracted from the feed uid and text fields have been repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedEvent {
    /// Identifier of the event in the import target.
    pub import_id: String,
    /// Event title.
    pub title: String,
    /// Optional free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// First day of the event.
    pub dtstart: SemanticDate,
    /// Last day as declared by the feed. Not used for the date range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtend: Option<SemanticDate>,
    /// Category label, if the event declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Supported recurrence rule, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
}

impl ValidatedEvent {
    /// Creates a validated event with only the required fields.
    pub fn new(
        import_id: impl Into<String>,
        title: impl Into<String>,
        dtstart: SemanticDate,
    ) -> Self {
        Self {
            import_id: import_id.into(),
            title: title.into(),
            description: None,
            dtstart,
            dtend: None,
            category: None,
            recurrence: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the declared end date.
    pub fn with_dtend(mut self, dtend: SemanticDate) -> Self {
        self.dtend = Some(dtend);
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Sets the recurrence rule.
    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    /// Returns true if the feed declared no end date.
    pub fn has_no_end(&self) -> bool {
        self.dtend.is_none()
    }
}

/// A normalized event, ready to be exported.
///
/// Serializes as:
///
/// ```json
/// {"importId": "...", "title": "...", "description": "...",
///  "locationId": "..." | null, "dates": {"start": "YYYY-MM-DD", "end": "YYYY-MM-DD"}}
/// ```
///
/// `description` is omitted when absent and `locationId` is omitted when the
/// event asserts no category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    /// Identifier of the event in the import target.
    pub import_id: String,
    /// Event title.
    pub title: String,
    /// Optional free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Resolved location.
    #[serde(skip_serializing_if = "Location::is_unassigned")]
    pub location_id: Location,
    /// Inclusive date range, `start <= end`.
    pub dates: DateRange,
}

impl NormalizedEvent {
    /// Assembles a normalized event from its validated form and the resolved
    /// range and location.
    pub fn from_validated(event: ValidatedEvent, dates: DateRange, location: Location) -> Self {
        Self {
            import_id: event.import_id,
            title: event.title,
            description: event.description,
            location_id: location,
            dates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::resolve_range;

    fn sample_event() -> ValidatedEvent {
        ValidatedEvent::new(
            "abc123",
            "Team Meeting",
            SemanticDate::new(2024, 1, 15).unwrap(),
        )
    }

    #[test]
    fn tracks_missing_end() {
        let event = sample_event();
        assert!(event.has_no_end());
        let event = event.with_dtend(SemanticDate::new(2024, 1, 16).unwrap());
        assert!(!event.has_no_end());
    }

    #[test]
    fn assembles_from_validated() {
        let event = sample_event().with_description("Weekly sync");
        let range = resolve_range(&event.dtstart, event.recurrence.as_ref());
        let normalized = NormalizedEvent::from_validated(event, range, Location::Freeform);

        assert_eq!(normalized.import_id, "abc123");
        assert_eq!(normalized.title, "Team Meeting");
        assert_eq!(normalized.description.as_deref(), Some("Weekly sync"));
        assert_eq!(normalized.location_id, Location::Freeform);
    }

    mod serialization {
        use super::*;

        #[test]
        fn omits_unassigned_location_and_missing_description() {
            let event = sample_event();
            let range = resolve_range(&event.dtstart, None);
            let normalized = NormalizedEvent::from_validated(event, range, Location::Unassigned);

            insta::assert_json_snapshot!(normalized, @r#"
            {
              "importId": "abc123",
              "title": "Team Meeting",
              "dates": {
                "start": "2024-01-15",
                "end": "2024-01-15"
              }
            }
            "#);
        }

        #[test]
        fn freeform_location_is_null() {
            let event = sample_event();
            let range = resolve_range(&event.dtstart, None);
            let normalized = NormalizedEvent::from_validated(event, range, Location::Freeform);

            let value = serde_json::to_value(&normalized).unwrap();
            assert!(value.get("locationId").unwrap().is_null());
        }

        #[test]
        fn room_location_and_recurrence_range() {
            let event = sample_event()
                .with_description("Story hour")
                .with_recurrence(Recurrence::DailyUntil(SemanticDate::new(2024, 1, 10).unwrap()));
            let range = resolve_range(&event.dtstart, event.recurrence.as_ref());
            let normalized =
                NormalizedEvent::from_validated(event, range, Location::Room("room-1".into()));

            insta::assert_json_snapshot!(normalized, @r#"
            {
              "importId": "abc123",
              "title": "Team Meeting",
              "description": "Story hour",
              "locationId": "room-1",
              "dates": {
                "start": "2024-01-10",
                "end": "2024-01-15"
              }
            }
            "#);
        }

        #[test]
        fn validated_event_shape() {
            let event = sample_event()
                .with_category(Category::Foster)
                .with_recurrence(Recurrence::DailyUntil(SemanticDate::new(2024, 1, 20).unwrap()));
            let value = serde_json::to_value(&event).unwrap();

            assert_eq!(value["importId"], "abc123");
            assert_eq!(value["dtstart"], "2024-01-15");
            assert_eq!(value["category"], "Foster");
            assert_eq!(value["recurrence"]["frequency"], "DAILY");
            assert_eq!(value["recurrence"]["until"], "2024-01-20");
            assert!(value.get("dtend").is_none());
        }
    }
}
