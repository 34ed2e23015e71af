//! Schema validation of flat records.
//!
//! [`EventSchema::validate`] checks a [`FlatRecord`] field by field and either
//! returns a [`ValidatedEvent`] or a [`ValidationError`] listing every field
//! that failed. Each field has its own validation function returning
//! `Result<T, FieldError>`; the results are combined without short-circuiting
//! so that one bad record reports all of its problems at once.
//!
//! | field         | rule                                                          |
//! |---------------|---------------------------------------------------------------|
//! | `uid`         | required, `<10 digits>-<token>-<6 digits>@<domain>`, → token  |
//! | `summary`     | required text (may be empty), repaired                        |
//! | `dtstart`     | required pure date                                            |
//! | `dtend`       | optional pure date                                            |
//! | `categories`  | optional, one of the known labels                             |
//! | `description` | optional text, repaired                                       |
//! | `rrule`       | optional, `FREQ=DAILY` with a pure-date `UNTIL`               |

use std::fmt;

use calimport_core::{Category, Recurrence, SemanticDate, ValidatedEvent, repair_text};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::component::{DateValue, FlatRecord, FlatValue};

/// Why a single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldErrorKind {
    #[error("required field is missing")]
    Missing,

    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{value:?} does not match the expected format")]
    PatternMismatch { value: String },

    #[error("{value} is not a valid calendar date")]
    InvalidDate { value: String },

    #[error("unknown category {label:?}")]
    UnknownCategory { label: String },

    #[error("unsupported recurrence frequency {freq:?}, only DAILY is supported")]
    UnsupportedFrequency { freq: String },

    #[error("recurrence has no UNTIL date")]
    MissingUntil,
}

/// A validation failure of one field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{field}: {kind}")]
pub struct FieldError {
    /// Name of the failing field.
    pub field: &'static str,
    /// What went wrong.
    #[serde(flatten)]
    pub kind: FieldErrorKind,
}

impl FieldError {
    fn new(field: &'static str, kind: FieldErrorKind) -> Self {
        Self { field, kind }
    }
}

/// Every field error of one record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub struct ValidationError {
    /// Field errors, in validation order. Never empty.
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    /// Returns true if the named field failed.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|error| error.field == field)
    }

    /// Returns the error of the named field, if it failed.
    pub fn field(&self, field: &str) -> Option<&FieldErrorKind> {
        self.fields
            .iter()
            .find(|error| error.field == field)
            .map(|error| &error.kind)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.fields.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// The declared shape of a feed event.
#[derive(Debug, Clone)]
pub struct EventSchema {
    uid_domain: String,
    uid_pattern: Regex,
}

impl EventSchema {
    /// The domain suffix of uids in the production feed.
    pub const DEFAULT_UID_DOMAIN: &'static str = "afosterri.org";

    /// Creates a schema accepting uids under the given domain.
    ///
    /// The token is everything between the ten-digit prefix and the
    /// `-<6 digits>@<domain>` suffix, so it may itself contain hyphens.
    ///
    /// # Errors
    ///
    /// Returns an error if the uid pattern cannot be compiled.
    pub fn new(uid_domain: impl Into<String>) -> Result<Self, regex::Error> {
        let uid_domain = uid_domain.into();
        let uid_pattern = Regex::new(&format!(
            r"^\d{{10}}-(?P<token>[^@\s]+?)-\d{{6}}@{}$",
            regex::escape(&uid_domain)
        ))?;
        Ok(Self {
            uid_domain,
            uid_pattern,
        })
    }

    /// Returns the domain uids must belong to.
    pub fn uid_domain(&self) -> &str {
        &self.uid_domain
    }

    /// Validates a record.
    ///
    /// # Errors
    ///
    /// Returns every field error found in the record.
    pub fn validate(&self, record: &FlatRecord) -> Result<ValidatedEvent, ValidationError> {
        let mut errors = Vec::new();

        let import_id = keep(self.import_id(record), &mut errors);
        let title = keep(required_text(record, "summary").map(repair_text), &mut errors);
        let dtstart = keep(required_date(record, "dtstart"), &mut errors);
        let dtend = keep(optional_date(record, "dtend"), &mut errors);
        let category = keep(category(record), &mut errors);
        let description = keep(
            optional_text(record, "description").map(|text| text.map(repair_text)),
            &mut errors,
        );
        let recurrence = keep(recurrence(record), &mut errors);

        match (
            import_id,
            title,
            dtstart,
            dtend,
            category,
            description,
            recurrence,
        ) {
            (
                Some(import_id),
                Some(title),
                Some(dtstart),
                Some(dtend),
                Some(category),
                Some(description),
                Some(recurrence),
            ) if errors.is_empty() => Ok(ValidatedEvent {
                import_id,
                title,
                description,
                dtstart,
                dtend,
                category,
                recurrence,
            }),
            _ => Err(ValidationError { fields: errors }),
        }
    }

    /// Validates `uid` and extracts the import token.
    fn import_id(&self, record: &FlatRecord) -> Result<String, FieldError> {
        let uid = required_text(record, "uid")?;
        self.uid_pattern
            .captures(uid)
            .and_then(|captures| captures.name("token"))
            .map(|token| token.as_str().to_string())
            .ok_or_else(|| {
                FieldError::new(
                    "uid",
                    FieldErrorKind::PatternMismatch {
                        value: uid.to_string(),
                    },
                )
            })
    }
}

impl Default for EventSchema {
    fn default() -> Self {
        Self::new(Self::DEFAULT_UID_DOMAIN).expect("default uid pattern should be valid")
    }
}

/// Moves a field result into `errors` on failure.
fn keep<T>(result: Result<T, FieldError>, errors: &mut Vec<FieldError>) -> Option<T> {
    result.map_err(|error| errors.push(error)).ok()
}

fn optional_text<'a>(
    record: &'a FlatRecord,
    field: &'static str,
) -> Result<Option<&'a str>, FieldError> {
    match record.get(field) {
        None => Ok(None),
        Some(FlatValue::Text(text)) => Ok(Some(text)),
        Some(other) => Err(wrong_type(field, "text", other)),
    }
}

fn required_text<'a>(record: &'a FlatRecord, field: &'static str) -> Result<&'a str, FieldError> {
    match record.get(field) {
        None => Err(FieldError::new(field, FieldErrorKind::Missing)),
        Some(FlatValue::Text(text)) => Ok(text),
        Some(other) => Err(wrong_type(field, "text", other)),
    }
}

fn optional_date(
    record: &FlatRecord,
    field: &'static str,
) -> Result<Option<SemanticDate>, FieldError> {
    match record.get(field) {
        None => Ok(None),
        Some(FlatValue::Date(value)) => semantic_date(field, value).map(Some),
        Some(other) => Err(wrong_type(field, "date", other)),
    }
}

fn required_date(record: &FlatRecord, field: &'static str) -> Result<SemanticDate, FieldError> {
    optional_date(record, field)?.ok_or_else(|| FieldError::new(field, FieldErrorKind::Missing))
}

/// Converts a decoded value to a pure calendar date.
fn semantic_date(field: &'static str, value: &DateValue) -> Result<SemanticDate, FieldError> {
    if !value.is_date_only() {
        return Err(FieldError::new(
            field,
            FieldErrorKind::WrongType {
                expected: "date",
                found: "date-time",
            },
        ));
    }
    SemanticDate::new(value.year, value.month, value.day).ok_or_else(|| {
        FieldError::new(
            field,
            FieldErrorKind::InvalidDate {
                value: value.to_string(),
            },
        )
    })
}

fn category(record: &FlatRecord) -> Result<Option<Category>, FieldError> {
    let label = optional_text(record, "categories")?;
    let Some(label) = label.filter(|label| !label.is_empty()) else {
        return Ok(None);
    };
    label.parse::<Category>().map(Some).map_err(|_| {
        FieldError::new(
            "categories",
            FieldErrorKind::UnknownCategory {
                label: label.to_string(),
            },
        )
    })
}

fn recurrence(record: &FlatRecord) -> Result<Option<Recurrence>, FieldError> {
    let rule = match record.get("rrule") {
        None => return Ok(None),
        Some(FlatValue::Recurrence(rule)) => rule,
        Some(other) => return Err(wrong_type("rrule", "recurrence", other)),
    };

    if rule.freq != "DAILY" {
        return Err(FieldError::new(
            "rrule",
            FieldErrorKind::UnsupportedFrequency {
                freq: rule.freq.clone(),
            },
        ));
    }

    let until = rule
        .until
        .as_ref()
        .ok_or_else(|| FieldError::new("rrule", FieldErrorKind::MissingUntil))?;

    semantic_date("rrule", until).map(|until| Some(Recurrence::DailyUntil(until)))
}

fn wrong_type(field: &'static str, expected: &'static str, found: &FlatValue) -> FieldError {
    FieldError::new(
        field,
        FieldErrorKind::WrongType {
            expected,
            found: found.kind(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::RecurValue;

    fn text(value: &str) -> FlatValue {
        FlatValue::Text(value.to_string())
    }

    fn date(y: i32, m: u32, d: u32) -> FlatValue {
        FlatValue::Date(DateValue::date(y, m, d))
    }

    fn valid_record() -> FlatRecord {
        FlatRecord::from([
            (
                "uid".to_string(),
                text("1234567890-abc123-999999@afosterri.org"),
            ),
            ("summary".to_string(), text("Team Meeting")),
            ("dtstart".to_string(), date(2024, 1, 15)),
        ])
    }

    fn with(mut record: FlatRecord, key: &str, value: FlatValue) -> FlatRecord {
        record.insert(key.to_string(), value);
        record
    }

    fn validate(record: &FlatRecord) -> Result<ValidatedEvent, ValidationError> {
        EventSchema::default().validate(record)
    }

    mod accepted {
        use super::*;

        #[test]
        fn minimal_record() {
            let event = validate(&valid_record()).unwrap();
            assert_eq!(event.import_id, "abc123");
            assert_eq!(event.title, "Team Meeting");
            assert_eq!(event.dtstart, SemanticDate::new(2024, 1, 15).unwrap());
            assert_eq!(event.description, None);
            assert_eq!(event.dtend, None);
            assert_eq!(event.category, None);
            assert_eq!(event.recurrence, None);
        }

        #[test]
        fn all_optional_fields() {
            let record = with(valid_record(), "dtend", date(2024, 1, 16));
            let record = with(record, "categories", text("Foster"));
            let record = with(record, "description", text("Bring snacks"));
            let record = with(
                record,
                "rrule",
                FlatValue::Recurrence(
                    RecurValue::new("DAILY").with_until(DateValue::date(2024, 1, 20)),
                ),
            );

            let event = validate(&record).unwrap();
            assert_eq!(event.dtend, SemanticDate::new(2024, 1, 16));
            assert_eq!(event.category, Some(Category::Foster));
            assert_eq!(event.description.as_deref(), Some("Bring snacks"));
            assert_eq!(
                event.recurrence,
                Some(Recurrence::DailyUntil(
                    SemanticDate::new(2024, 1, 20).unwrap()
                ))
            );
        }

        #[test]
        fn repairs_text_fields() {
            let record = with(valid_record(), "summary", text("Parents\u{FFFD} Night"));
            let record = with(record, "description", text("Don\u{FFFD}t be late"));

            let event = validate(&record).unwrap();
            assert_eq!(event.title, "Parents\u{2019} Night");
            assert_eq!(event.description.as_deref(), Some("Don\u{2019}t be late"));
        }

        #[test]
        fn empty_description_is_kept() {
            let record = with(valid_record(), "description", text(""));
            assert_eq!(validate(&record).unwrap().description.as_deref(), Some(""));
        }

        #[test]
        fn empty_summary_is_accepted() {
            for summary in ["", "   "] {
                let record = with(valid_record(), "summary", text(summary));
                assert_eq!(validate(&record).unwrap().title, summary);
            }
        }

        #[test]
        fn ignores_unknown_properties() {
            let record = with(valid_record(), "location", text("Hall B"));
            let record = with(record, "dtstamp", date(2024, 1, 1));
            assert!(validate(&record).is_ok());
        }

        #[test]
        fn custom_domain() {
            let schema = EventSchema::new("example.com").unwrap();
            let record = with(
                valid_record(),
                "uid",
                text("0000000000-tok-000000@example.com"),
            );
            assert_eq!(schema.validate(&record).unwrap().import_id, "tok");
            assert_eq!(schema.uid_domain(), "example.com");
        }
    }

    mod uid {
        use super::*;

        #[test]
        fn wrong_domain_is_rejected() {
            let record = with(
                valid_record(),
                "uid",
                text("1234567890-abc123-999999@example.org"),
            );
            let err = validate(&record).unwrap_err();
            assert!(matches!(
                err.field("uid"),
                Some(FieldErrorKind::PatternMismatch { .. })
            ));
        }

        #[test]
        fn domain_dots_are_literal() {
            let record = with(
                valid_record(),
                "uid",
                text("1234567890-abc123-999999@afosterriXorg"),
            );
            assert!(validate(&record).unwrap_err().has_field("uid"));
        }

        #[test]
        fn wrong_digit_counts_are_rejected() {
            for uid in [
                "123456789-abc123-999999@afosterri.org",
                "1234567890-abc123-99999@afosterri.org",
                "1234567890--999999@afosterri.org",
                "x1234567890-abc123-999999@afosterri.org",
            ] {
                let record = with(valid_record(), "uid", text(uid));
                assert!(validate(&record).unwrap_err().has_field("uid"), "{uid}");
            }
        }

        #[test]
        fn token_may_contain_hyphens() {
            let record = with(
                valid_record(),
                "uid",
                text("1234567890-abc-123-x-999999@afosterri.org"),
            );
            assert_eq!(validate(&record).unwrap().import_id, "abc-123-x");
        }

        #[test]
        fn missing_uid() {
            let mut record = valid_record();
            record.remove("uid");
            let err = validate(&record).unwrap_err();
            assert_eq!(err.field("uid"), Some(&FieldErrorKind::Missing));
        }
    }

    mod dates {
        use super::*;

        #[test]
        fn date_time_start_is_rejected() {
            let record = with(
                valid_record(),
                "dtstart",
                FlatValue::Date(DateValue::date(2024, 1, 15).at(9, 0, 0, true)),
            );
            let err = validate(&record).unwrap_err();
            assert_eq!(
                err.field("dtstart"),
                Some(&FieldErrorKind::WrongType {
                    expected: "date",
                    found: "date-time"
                })
            );
        }

        #[test]
        fn impossible_date_is_rejected() {
            let record = with(valid_record(), "dtend", date(2024, 2, 30));
            let err = validate(&record).unwrap_err();
            assert_eq!(
                err.field("dtend"),
                Some(&FieldErrorKind::InvalidDate {
                    value: "2024-02-30".to_string()
                })
            );
        }

        #[test]
        fn text_start_is_rejected() {
            let record = with(valid_record(), "dtstart", text("tomorrow"));
            assert!(validate(&record).unwrap_err().has_field("dtstart"));
        }
    }

    mod categories {
        use super::*;

        #[test]
        fn unknown_label_is_rejected() {
            let record = with(valid_record(), "categories", text("Kitchen"));
            let err = validate(&record).unwrap_err();
            assert_eq!(
                err.field("categories"),
                Some(&FieldErrorKind::UnknownCategory {
                    label: "Kitchen".to_string()
                })
            );
        }

        #[test]
        fn empty_label_is_absent() {
            let record = with(valid_record(), "categories", text(""));
            assert_eq!(validate(&record).unwrap().category, None);
        }

        #[test]
        fn every_known_label_is_accepted() {
            for category in Category::ALL {
                let record = with(valid_record(), "categories", text(category.label()));
                assert_eq!(validate(&record).unwrap().category, Some(category));
            }
        }
    }

    mod recurrence {
        use super::*;

        fn rule(freq: &str, until: Option<DateValue>) -> FlatValue {
            let mut rule = RecurValue::new(freq);
            rule.until = until;
            FlatValue::Recurrence(rule)
        }

        #[test]
        fn non_daily_frequencies_are_rejected() {
            for freq in ["WEEKLY", "MONTHLY", "YEARLY", "HOURLY", "daily"] {
                let record = with(
                    valid_record(),
                    "rrule",
                    rule(freq, Some(DateValue::date(2024, 2, 1))),
                );
                let err = validate(&record).unwrap_err();
                assert_eq!(
                    err.field("rrule"),
                    Some(&FieldErrorKind::UnsupportedFrequency {
                        freq: freq.to_string()
                    }),
                );
            }
        }

        #[test]
        fn daily_without_until_is_rejected() {
            let record = with(valid_record(), "rrule", rule("DAILY", None));
            let err = validate(&record).unwrap_err();
            assert_eq!(err.field("rrule"), Some(&FieldErrorKind::MissingUntil));
        }

        #[test]
        fn date_time_until_is_rejected() {
            let until = DateValue::date(2024, 2, 1).at(23, 59, 59, true);
            let record = with(valid_record(), "rrule", rule("DAILY", Some(until)));
            assert!(validate(&record).unwrap_err().has_field("rrule"));
        }
    }

    mod reporting {
        use super::*;

        #[test]
        fn collects_every_field_error() {
            let record = FlatRecord::from([
                ("uid".to_string(), text("nope")),
                ("categories".to_string(), text("Kitchen")),
            ]);

            let err = validate(&record).unwrap_err();
            let fields: Vec<_> = err.fields.iter().map(|e| e.field).collect();
            assert_eq!(fields, vec!["uid", "summary", "dtstart", "categories"]);
        }

        #[test]
        fn display_lists_fields() {
            let mut record = valid_record();
            record.remove("summary");
            let err = validate(&record).unwrap_err();
            assert_eq!(err.to_string(), "summary: required field is missing");
        }

        #[test]
        fn serializes_field_errors() {
            let record = with(
                valid_record(),
                "uid",
                text("1234567890-abc123-999999@example.org"),
            );
            let err = validate(&record).unwrap_err();
            insta::assert_json_snapshot!(err, @r#"
            {
              "fields": [
                {
                  "field": "uid",
                  "kind": "pattern_mismatch",
                  "value": "1234567890-abc123-999999@example.org"
                }
              ]
            }
            "#);
        }
    }
}
