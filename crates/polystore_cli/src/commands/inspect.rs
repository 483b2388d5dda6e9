//! Inspect command implementation.

use polystore_core::Store;

/// Prints backend metadata in the requested format.
pub fn run(store: &Store, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let info = store.describe()?;
    match format {
        "json" => {
            let doc = serde_json::json!({
                "backend": info.kind.to_string(),
                "location": info.location,
                "records": info.records,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        _ => {
            println!("backend:  {}", info.kind);
            println!("location: {}", info.location);
            println!("records:  {}", info.records);
        }
    }
    Ok(())
}
