//! ICS/iCalendar parsing utilities.
//!
//! This module parses iCalendar (RFC 5545) text with the `icalendar` crate and
//! exposes each VEVENT as a [`RawComponent`]. Property values are decoded on
//! access:
//!
//! - date properties (`DTSTART`, `DTEND`, ...) as `YYYYMMDD` dates or
//!   `YYYYMMDDTHHMMSS[Z]` date-times
//! - `RRULE` as `KEY=VALUE` parts with a mandatory `FREQ`
//! - `CATEGORIES` as a comma-separated list, where `\,` is a literal comma
//! - everything else as text
//!
//! Repeatable properties (`CATEGORIES`, `COMMENT`, ...) are read from
//! [`Component::multi_properties`]; their values are concatenated in source
//! order. `EXDATE` is not exposed.

use std::collections::BTreeMap;

use icalendar::parser::unfold;
use icalendar::{Calendar, CalendarComponent, Component, Event, Property};
use tracing::debug;

use crate::component::{DateValue, FlatValue, PropertyError, RawComponent, RecurValue};
use crate::error::{FeedError, FeedResult};

/// Properties whose values are dates or date-times.
const DATE_PROPERTIES: [&str; 7] = [
    "DTSTART",
    "DTEND",
    "DTSTAMP",
    "CREATED",
    "LAST-MODIFIED",
    "RECURRENCE-ID",
    "DUE",
];

/// Repeatable properties that are not exposed to the pipeline.
const HIDDEN_PROPERTIES: [&str; 1] = ["EXDATE"];

/// Stands in for an escaped comma in a `CATEGORIES` value.
///
/// The parser unescapes TEXT values, after which `a\,b` and `a,b` can no
/// longer be told apart.
const ESCAPED_COMMA: char = '\u{E000}';

/// Parses ICS content and returns its events in source order.
///
/// # Errors
///
/// Returns a parse error if the text is not an iCalendar document.
pub fn parse_calendar(ics: &str) -> FeedResult<Vec<Event>> {
    let calendar = mark_escaped_commas(&unfold(ics))
        .parse::<Calendar>()
        .map_err(|e| FeedError::parse(format!("invalid iCalendar data: {}", e)))?;

    let events: Vec<Event> = calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => Some(event.clone()),
            _ => None,
        })
        .collect();

    debug!(count = events.len(), "Parsed events from ICS");
    Ok(events)
}

/// Replaces `\,` in `CATEGORIES` lines of unfolded ICS text with
/// [`ESCAPED_COMMA`].
fn mark_escaped_commas(ics: &str) -> String {
    ics.split_inclusive('\n')
        .map(|line| match categories_value_start(line) {
            Some(start) => {
                let (head, value) = line.split_at(start);
                format!("{}{}", head, mark_value(value))
            }
            None => line.to_string(),
        })
        .collect()
}

fn mark_value(value: &str) -> String {
    let mut marked = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            marked.push(c);
            continue;
        }
        match chars.next() {
            Some(',') => marked.push(ESCAPED_COMMA),
            Some(next) => {
                marked.push('\\');
                marked.push(next);
            }
            None => marked.push('\\'),
        }
    }
    marked
}

/// Returns the byte offset of the value of a `CATEGORIES` content line.
fn categories_value_start(line: &str) -> Option<usize> {
    let name_end = line.find([';', ':'])?;
    if line[..name_end].trim_start() != "CATEGORIES" {
        return None;
    }

    let mut quoted = false;
    for (i, c) in line.char_indices().skip_while(|(i, _)| *i < name_end) {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Returns every property of an event with the given name, in source order.
fn event_properties<'a>(event: &'a Event, name: &str) -> Vec<&'a Property> {
    if let Some(property) = event.properties().get(name) {
        return vec![property];
    }
    if HIDDEN_PROPERTIES.contains(&name) {
        return Vec::new();
    }
    event
        .multi_properties()
        .get(name)
        .map(|properties| properties.iter().collect())
        .unwrap_or_default()
}

impl RawComponent for Event {
    fn property_names(&self) -> Vec<String> {
        self.properties()
            .keys()
            .chain(self.multi_properties().keys())
            .filter(|name| !HIDDEN_PROPERTIES.contains(&name.as_str()))
            .cloned()
            .collect()
    }

    fn property_values(&self, name: &str) -> Result<Vec<FlatValue>, PropertyError> {
        let mut values = Vec::new();
        for property in event_properties(self, name) {
            values.extend(decode_property(name, property.value())?);
        }
        Ok(values)
    }

    fn raw_properties(&self) -> BTreeMap<String, String> {
        self.property_names()
            .into_iter()
            .map(|name| {
                let raw: Vec<String> = event_properties(self, &name)
                    .iter()
                    .map(|property| property.value().replace(ESCAPED_COMMA, "\\,"))
                    .collect();
                (name, raw.join(","))
            })
            .collect()
    }
}

/// Decodes the raw text of a property into its values.
///
/// # Errors
///
/// Returns an error if a date or recurrence value is malformed.
pub fn decode_property(name: &str, raw: &str) -> Result<Vec<FlatValue>, PropertyError> {
    let upper = name.to_ascii_uppercase();

    if DATE_PROPERTIES.contains(&upper.as_str()) {
        return Ok(vec![FlatValue::Date(decode_date(name, raw)?)]);
    }

    match upper.as_str() {
        "RRULE" => Ok(vec![FlatValue::Recurrence(decode_recurrence(name, raw)?)]),
        "CATEGORIES" => Ok(split_categories(raw)
            .into_iter()
            .map(FlatValue::Text)
            .collect()),
        _ => Ok(vec![FlatValue::Text(raw.to_string())]),
    }
}

/// Splits a `CATEGORIES` value into labels.
///
/// Accepts both the parser's output, where escaped commas are
/// [`ESCAPED_COMMA`], and raw text with `\,` escapes.
fn split_categories(raw: &str) -> Vec<String> {
    let mut labels = Vec::new();
    let mut label = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            ',' => labels.push(std::mem::take(&mut label)),
            ESCAPED_COMMA => label.push(','),
            '\\' => match chars.next() {
                Some(',') => label.push(','),
                Some(next) => {
                    label.push('\\');
                    label.push(next);
                }
                None => label.push('\\'),
            },
            _ => label.push(c),
        }
    }
    labels.push(label);

    labels
        .into_iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .collect()
}

/// Decodes an iCalendar date or date-time.
///
/// Handles formats like:
/// - 20250205 (date only)
/// - 20250205T100000 (floating date-time)
/// - 20250205T100000Z (UTC date-time)
fn decode_date(property: &str, raw: &str) -> Result<DateValue, PropertyError> {
    let raw = raw.trim();
    let (date_part, time_part) = match raw.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (raw, None),
    };

    if !is_digits(date_part, 8) {
        return Err(PropertyError::new(
            property,
            format!("expected a YYYYMMDD date, got {:?}", raw),
        ));
    }

    let year = number(property, raw, &date_part[0..4])?;
    let month = number(property, raw, &date_part[4..6])?;
    let day = number(property, raw, &date_part[6..8])?;
    let value = DateValue::date(year as i32, month, day);

    let Some(time_part) = time_part else {
        return Ok(value);
    };

    let (time_part, utc) = match time_part.strip_suffix('Z') {
        Some(time) => (time, true),
        None => (time_part, false),
    };

    if !is_digits(time_part, 6) {
        return Err(PropertyError::new(
            property,
            format!("expected a HHMMSS time, got {:?}", raw),
        ));
    }

    let hour = number(property, raw, &time_part[0..2])?;
    let minute = number(property, raw, &time_part[2..4])?;
    let second = number(property, raw, &time_part[4..6])?;

    Ok(value.at(hour, minute, second, utc))
}

/// Returns true if `s` is exactly `len` ASCII digits.
fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a run of ASCII digits.
fn number(property: &str, raw: &str, digits: &str) -> Result<u32, PropertyError> {
    digits
        .parse()
        .map_err(|e| PropertyError::new(property, format!("bad number in {:?}: {}", raw, e)))
}

/// Decodes an `RRULE` value.
fn decode_recurrence(property: &str, raw: &str) -> Result<RecurValue, PropertyError> {
    let mut freq = None;
    let mut until = None;
    let mut parts = BTreeMap::new();

    for part in raw.trim().split(';').filter(|part| !part.is_empty()) {
        let (key, value) = part.split_once('=').ok_or_else(|| {
            PropertyError::new(property, format!("malformed rule part {:?}", part))
        })?;

        match key.trim().to_ascii_uppercase().as_str() {
            "FREQ" => freq = Some(value.trim().to_string()),
            "UNTIL" => until = Some(decode_date(property, value)?),
            other => {
                parts.insert(other.to_string(), value.trim().to_string());
            }
        }
    }

    let freq = freq.ok_or_else(|| PropertyError::new(property, "rule has no FREQ part"))?;

    Ok(RecurValue { freq, until, parts })
}
