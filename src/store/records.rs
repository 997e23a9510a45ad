//! Mapping between domain records and stored documents.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::Value;

use super::{Collection, Document, Filter, StoreError};
use crate::domain::{CleanRecord, Observation, TimeSeries};

/// Canonical field holding the entity (state) name.
pub const ENTITY_FIELD: &str = "state";
/// Canonical field holding the observation date (`YYYY-MM-DD`).
pub const DATE_FIELD: &str = "date";
/// Canonical field holding the groundwater level.
pub const VALUE_FIELD: &str = "water_level";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn record_to_document(record: &CleanRecord) -> Document {
    let mut doc = Document::new();
    for (key, value) in &record.extras {
        doc.insert(key.clone(), Value::String(value.clone()));
    }
    doc.insert(ENTITY_FIELD.to_string(), Value::String(record.entity_id.clone()));
    doc.insert(
        DATE_FIELD.to_string(),
        Value::String(record.timestamp.format(DATE_FORMAT).to_string()),
    );
    doc.insert(VALUE_FIELD.to_string(), Value::from(record.value));
    doc
}

/// Parse one projected `{date, water_level}` document.
pub fn document_to_observation(doc: &Document) -> Result<Observation, StoreError> {
    let raw_date = doc
        .get(DATE_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Malformed(format!("missing `{DATE_FIELD}`")))?;
    let timestamp = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
        .map_err(|e| StoreError::Malformed(format!("invalid `{DATE_FIELD}` '{raw_date}': {e}")))?;

    let value = doc
        .get(VALUE_FIELD)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .ok_or_else(|| StoreError::Malformed(format!("missing or non-numeric `{VALUE_FIELD}`")))?;

    Ok(Observation { timestamp, value })
}

/// Distinct entity ids present in the collection, sorted.
///
/// Non-string ids are ignored.
pub fn list_entities<C: Collection + ?Sized>(collection: &C) -> Result<Vec<String>, StoreError> {
    let mut ids: Vec<String> = collection
        .distinct(ENTITY_FIELD)?
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            other => {
                tracing::warn!(value = %other, "ignoring non-string entity id");
                None
            }
        })
        .collect();
    ids.sort();
    Ok(ids)
}

/// One entity's history, or why it could not be read.
pub type LoadedSeries = (String, Result<TimeSeries, StoreError>);

/// Load the history of every entity with a single scan of the collection.
///
/// Entities come back sorted by id, each series sorted ascending by date. A
/// malformed document fails only the entity it belongs to.
pub fn load_all_series<C: Collection + ?Sized>(collection: &C) -> Result<Vec<LoadedSeries>, StoreError> {
    let entities = list_entities(collection)?;
    let docs = collection.find(&Filter::all(), Some(&[ENTITY_FIELD, DATE_FIELD, VALUE_FIELD][..]))?;

    let mut grouped: HashMap<String, Result<Vec<Observation>, StoreError>> = HashMap::new();
    for doc in &docs {
        let Some(Value::String(entity)) = doc.get(ENTITY_FIELD) else {
            continue;
        };
        let parsed = document_to_observation(doc);
        let slot = grouped.entry(entity.clone()).or_insert_with(|| Ok(Vec::new()));
        if let Ok(observations) = slot {
            match parsed {
                Ok(observation) => observations.push(observation),
                Err(e) => *slot = Err(e),
            }
        }
    }

    Ok(entities
        .into_iter()
        .map(|id| {
            let series = grouped
                .remove(&id)
                .unwrap_or_else(|| Ok(Vec::new()))
                .map(|observations| TimeSeries::new(id.as_str(), observations));
            (id, series)
        })
        .collect())
}
