//! Record extraction.
//!
//! Flattens a [`RawComponent`] into a [`FlatRecord`]: one entry per property,
//! keyed by lower-cased name, holding the property's first value. Exception
//! dates (`EXDATE`) are not modelled and are skipped.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::component::{FlatRecord, PropertyError, RawComponent};

/// Properties that are never copied into a flat record.
const SKIPPED_PROPERTIES: [&str; 1] = ["exdate"];

/// A component whose properties could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("component #{index}: {source}")]
pub struct ExtractionError {
    /// Position of the component in the feed, starting at 0.
    pub index: usize,
    /// Raw property text of the component.
    pub properties: BTreeMap<String, String>,
    /// The property that failed to decode.
    #[source]
    pub source: PropertyError,
}

/// Extracts a flat record from a component.
///
/// # Errors
///
/// Returns an [`ExtractionError`] carrying `index` and the component's raw
/// properties if any property fails to decode.
pub fn extract<C: RawComponent + ?Sized>(
    index: usize,
    component: &C,
) -> Result<FlatRecord, ExtractionError> {
    let mut record = FlatRecord::new();

    for name in component.property_names() {
        let key = name.to_ascii_lowercase();
        if SKIPPED_PROPERTIES.contains(&key.as_str()) || record.contains_key(&key) {
            continue;
        }

        let values = component
            .property_values(&name)
            .map_err(|source| ExtractionError {
                index,
                properties: component.raw_properties(),
                source,
            })?;

        if let Some(first) = values.into_iter().next() {
            trace!(index, property = %key, kind = first.kind(), "Extracted property");
            record.insert(key, first);
        }
    }

    Ok(record)
}
