//! Get command implementation.

use polystore_core::Store;

/// Retrieves records, optionally filtered by `field=value`, and prints them
/// as a JSON array.
pub fn run(store: &Store, filter: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let filter = filter.map(super::parse_filter).transpose()?;
    let rows = store.get_data(filter.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&super::records_to_json(&rows))?);
    Ok(())
}
