//! Sample command implementation.
//!
//! Generates deterministic demo records shaped like the classic personnel
//! example (`ssn`, `name`, `addr`, `salary`), suitable for piping into
//! `polystore save`.

use polystore_core::{Record, RecordSet};

const NAMES: [&str; 8] = [
    "Ada Lovelace",
    "Grace Hopper",
    "Edsger Dijkstra",
    "Barbara Liskov",
    "Donald Knuth",
    "Frances Allen",
    "Tony Hoare",
    "Margaret Hamilton",
];

const STREETS: [&str; 5] = [
    "Elm Street",
    "Oak Avenue",
    "Maple Drive",
    "Cedar Lane",
    "Birch Road",
];

/// Prints `count` generated records as a JSON array.
pub fn run(count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let records = generate(count);
    println!(
        "{}",
        serde_json::to_string_pretty(&super::records_to_json(&records))?
    );
    Ok(())
}

/// Generates up to 100 demo records.
pub fn generate(count: usize) -> RecordSet {
    (0..count.min(100))
        .map(|i| {
            let n = i as i64;
            Record::new()
                .with("ssn", format!("900-{:02}-{:04}", i % 100, 1000 + (n * 37) % 9000))
                .with("name", NAMES[i % NAMES.len()])
                .with(
                    "addr",
                    format!("{} {}", 100 + i * 7, STREETS[i % STREETS.len()]),
                )
                .with("salary", (1000 + (n * 353) % 9000) * 100)
        })
        .collect()
}
