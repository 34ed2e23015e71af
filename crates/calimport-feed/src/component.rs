//! Raw calendar components and the flat records extracted from them.
//!
//! [`RawComponent`] is the seam between whatever parsed the feed and the
//! import pipeline. A component exposes its property names and, per property,
//! a list of decoded [`FlatValue`]s. Decoding happens on access and may fail
//! with a [`PropertyError`] when the feed encodes a value badly.
//!
//! The extractor flattens a component into a [`FlatRecord`], keeping only the
//! first value of each property.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A calendar sub-block as supplied by a feed parser.
pub trait RawComponent {
    /// Returns the names of all properties, in source order.
    fn property_names(&self) -> Vec<String>;

    /// Decodes every value of the named property.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is not validly encoded for its property.
    fn property_values(&self, name: &str) -> Result<Vec<FlatValue>, PropertyError>;

    /// Returns the undecoded property text, for diagnostics.
    fn raw_properties(&self) -> BTreeMap<String, String>;
}

impl<T: RawComponent + ?Sized> RawComponent for Box<T> {
    fn property_names(&self) -> Vec<String> {
        (**self).property_names()
    }

    fn property_values(&self, name: &str) -> Result<Vec<FlatValue>, PropertyError> {
        (**self).property_values(name)
    }

    fn raw_properties(&self) -> BTreeMap<String, String> {
        (**self).raw_properties()
    }
}

/// A property value that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("property {property}: {reason}")]
pub struct PropertyError {
    /// Name of the offending property.
    pub property: String,
    /// Why decoding failed.
    pub reason: String,
}

impl PropertyError {
    /// Creates a property error.
    pub fn new(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            reason: reason.into(),
        }
    }
}

/// Time of day attached to a date-time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// True if the value carried the `Z` (UTC) suffix.
    pub utc: bool,
}

/// A decoded date or date-time value.
///
/// Components are kept exactly as written; whether they form a real calendar
/// date is checked during validation, not decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateValue {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Present for date-time values, absent for pure dates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<TimeOfDay>,
}

impl DateValue {
    /// Creates a pure date value.
    pub fn date(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            time: None,
        }
    }

    /// Attaches a time of day, turning this into a date-time value.
    pub fn at(mut self, hour: u32, minute: u32, second: u32, utc: bool) -> Self {
        self.time = Some(TimeOfDay {
            hour,
            minute,
            second,
            utc,
        });
        self
    }

    /// Returns true if this value is a pure date.
    pub fn is_date_only(&self) -> bool {
        self.time.is_none()
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)?;
        if let Some(time) = self.time {
            write!(f, "T{:02}:{:02}:{:02}", time.hour, time.minute, time.second)?;
            if time.utc {
                f.write_str("Z")?;
            }
        }
        Ok(())
    }
}

/// A decoded recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurValue {
    /// The `FREQ` part, as written.
    pub freq: String,
    /// The `UNTIL` part, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<DateValue>,
    /// Every other rule part, keyed by upper-cased name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parts: BTreeMap<String, String>,
}

impl RecurValue {
    /// Creates a rule with the given frequency.
    pub fn new(freq: impl Into<String>) -> Self {
        Self {
            freq: freq.into(),
            until: None,
            parts: BTreeMap::new(),
        }
    }

    /// Sets the `UNTIL` part.
    pub fn with_until(mut self, until: DateValue) -> Self {
        self.until = Some(until);
        self
    }
}

/// A single decoded property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FlatValue {
    /// Free text.
    Text(String),
    /// A date or date-time.
    Date(DateValue),
    /// A recurrence rule.
    Recurrence(RecurValue),
}

impl FlatValue {
    /// Returns a short name for the kind of value, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Date(date) if date.is_date_only() => "date",
            Self::Date(_) => "date-time",
            Self::Recurrence(_) => "recurrence",
        }
    }
}

/// Property name to first value, keyed by lower-cased property name.
pub type FlatRecord = BTreeMap<String, FlatValue>;
