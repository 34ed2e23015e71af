//! Date types for imported events.
//!
//! This module provides [`SemanticDate`] for the pure calendar dates carried by
//! feed events, [`CanonicalDate`] for the `YYYY-MM-DD` form written to
//! normalized records, and the resolvers that turn one into the other:
//!
//! - [`resolve_date`] converts a single date, taking its components at face value
//! - [`resolve_range`] derives an event's `[start, end]` range, expanding the
//!   supported daily recurrence and repairing reversed boundaries

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

/// A calendar date with no time of day and no timezone.
///
/// Only real calendar days can be represented: construction fails for
/// out-of-range months, days, or dates such as February 30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SemanticDate(NaiveDate);

impl SemanticDate {
    /// Creates a date from a 1-based month and day.
    ///
    /// Returns `None` if the triple does not name a real calendar day.
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Returns the year.
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the 1-based month.
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Returns the 1-based day of month.
    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl From<NaiveDate> for SemanticDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// The date representation written to normalized records.
///
/// Displays and serializes as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalDate(NaiveDate);

impl CanonicalDate {
    /// Returns the underlying calendar date.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Returns true if this date is strictly after `other`.
    pub fn is_after(&self, other: NaiveDate) -> bool {
        self.0 > other
    }
}

impl fmt::Display for CanonicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for CanonicalDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The inclusive date range covered by an event.
///
/// `start <= end` always holds for ranges built by [`resolve_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    /// First day of the event.
    pub start: CanonicalDate,
    /// Last day of the event.
    pub end: CanonicalDate,
}

impl DateRange {
    /// Returns true if the range covers a single day.
    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }
}

/// A supported recurrence rule.
///
/// Only plain daily recurrence bounded by an end date is modelled. Feeds using
/// any other rule are rejected during validation rather than approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "frequency", content = "until")]
pub enum Recurrence {
    /// `FREQ=DAILY;UNTIL=<date>`.
    #[serde(rename = "DAILY")]
    DailyUntil(SemanticDate),
}

impl Recurrence {
    /// Returns the last date of the recurrence.
    pub fn until(&self) -> &SemanticDate {
        match self {
            Self::DailyUntil(until) => until,
        }
    }
}

/// Converts a semantic date to its canonical form.
///
/// The components are used as-is; no timezone adjustment is ever applied.
pub fn resolve_date(date: &SemanticDate) -> CanonicalDate {
    CanonicalDate(date.0)
}

/// Derives the date range of an event.
///
/// The end boundary is the recurrence's `until` date when one is present,
/// otherwise the start date itself. If the end falls before the start the
/// two boundaries are swapped.
pub fn resolve_range(dtstart: &SemanticDate, recurrence: Option<&Recurrence>) -> DateRange {
    let start = resolve_date(dtstart);
    let end = recurrence.map_or(start, |rule| resolve_date(rule.until()));

    if end < start {
        debug!(%start, %end, "End date precedes start date, swapping");
        return DateRange {
            start: end,
            end: start,
        };
    }

    DateRange { start, end }
}
