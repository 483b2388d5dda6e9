//! Save command implementation.

use polystore_core::Store;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Reads a JSON array of records from `input` (stdin when `None`) and saves
/// it through the store.
pub fn run(store: &Store, input: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let records = super::records_from_json(&raw)?;
    info!("storing {} records via {} backend", records.len(), store.backend());
    let written = store.save_data(&records)?;
    let info = store.describe()?;
    println!(
        "Stored {written} records in {} storage at '{}' ({} total).",
        info.kind, info.location, info.records
    );
    Ok(())
}
