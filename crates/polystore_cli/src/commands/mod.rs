//! CLI command implementations.

pub mod get;
pub mod inspect;
pub mod sample;
pub mod save;
pub mod trim;

use polystore_core::{Filter, Record, RecordSet};

/// Parses a JSON array of objects (or a single object) into records.
pub fn records_from_json(raw: &str) -> Result<RecordSet, Box<dyn std::error::Error>> {
    let doc: serde_json::Value = serde_json::from_str(raw)?;
    let items = match doc {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };
    let records = items
        .iter()
        .map(Record::from_json)
        .collect::<Result<RecordSet, _>>()?;
    Ok(records)
}

/// Renders records as a JSON array.
pub fn records_to_json(records: &[Record]) -> serde_json::Value {
    serde_json::Value::Array(records.iter().map(Record::to_json).collect())
}

/// Parses a `field=value` equality filter. The value is kept textual; the
/// backends compare it with their native values by text when needed.
pub fn parse_filter(raw: &str) -> Result<Filter, Box<dyn std::error::Error>> {
    let (field, value) = raw
        .split_once('=')
        .ok_or("filter must have the form 'field=value'")?;
    let field = field.trim();
    if field.is_empty() {
        return Err("filter field name is empty".into());
    }
    Ok(Filter::equals(field, value.trim()))
}
