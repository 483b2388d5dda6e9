//! Trim command implementation.

use polystore_core::{Store, TrimEnd};

/// Removes `count` records from the chosen end of the store.
pub fn run(store: &Store, count: usize, newest: bool) -> Result<(), Box<dyn std::error::Error>> {
    let end = if newest {
        TrimEnd::Newest
    } else {
        TrimEnd::Oldest
    };
    let removed = store.trim_data(count, end)?;
    let remaining = store.describe()?.records;
    println!("Removed {removed} records, {remaining} remain.");
    Ok(())
}
