//! Storage provider trait definition.

use crate::error::{ProviderError, ProviderResult};
use crate::record::{Filter, Record, RecordSet};
use std::fmt;
use std::str::FromStr;

/// The closed set of backend kinds.
///
/// Backend selection is resolved once, at store construction, through an
/// explicit factory over this enum. There is no runtime plugin loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Flat CSV file with a header row.
    Csv,
    /// JSON document file holding a top-level array of objects.
    Json,
    /// Embedded SQLite database.
    Sqlite,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(ProviderError::configuration(format!(
                "unsupported backend kind '{other}'"
            ))),
        }
    }
}

/// Diagnostic metadata returned by [`Provider::describe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInfo {
    /// Which backend produced this.
    pub kind: BackendKind,
    /// Path or connection string of the medium.
    pub location: String,
    /// Number of records currently stored.
    pub records: usize,
}

/// Which end of the record sequence a trim removes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimEnd {
    /// Remove the first (earliest written) records.
    Oldest,
    /// Remove the last (most recently written) records.
    Newest,
}

/// A storage backend for record sets.
///
/// Providers own their handle to the underlying medium (an open file, a
/// database connection) and exchange [`Record`]s with the store.
///
/// # Invariants
///
/// - `connect` is idempotent: connecting an already-connected provider is a
///   no-op, not an error.
/// - `disconnect` never fails the caller; release failures are logged and
///   swallowed.
/// - `get_data` returns records in the order they were written.
/// - The schema snapshot (CSV header, SQLite column set) is taken once per
///   handle lifetime and is never re-inferred on later calls.
/// - No operation retries internally; failures are classified at the point
///   of occurrence and surfaced immediately.
///
/// # Implementors
///
/// - [`super::CsvProvider`] - append-only flat file with a header row
/// - [`super::JsonProvider`] - atomically rewritten document file
/// - [`super::SqliteProvider`] - embedded SQL database
pub trait Provider: Send {
    /// Which backend this provider implements.
    fn kind(&self) -> BackendKind;

    /// Establishes access to the medium.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the medium cannot be opened.
    fn connect(&mut self) -> ProviderResult<()>;

    /// Releases the handle. Infallible for the caller.
    fn disconnect(&mut self);

    /// Returns `true` while a handle is held.
    fn is_connected(&self) -> bool;

    /// Appends records to the medium, returning the number written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty record set or a record that
    /// does not fit the established schema, and a write error on I/O failure.
    fn save_data(&mut self, records: &[Record]) -> ProviderResult<usize>;

    /// Returns all records, or the subset matching `filter`, in insertion
    /// order. A medium that does not exist yet yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns a read error on I/O failure.
    fn get_data(&mut self, filter: Option<&Filter>) -> ProviderResult<RecordSet>;

    /// Removes up to `count` records from the chosen end, returning the
    /// number removed.
    ///
    /// # Errors
    ///
    /// Returns a read or write error on I/O failure.
    fn trim_data(&mut self, count: usize, end: TrimEnd) -> ProviderResult<usize>;

    /// Returns backend metadata for diagnostics. Does not mutate state.
    ///
    /// # Errors
    ///
    /// Returns a read error if the record count cannot be determined.
    fn describe(&self) -> ProviderResult<BackendInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_parses_known_names() {
        assert_eq!("csv".parse::<BackendKind>().unwrap(), BackendKind::Csv);
        assert_eq!("JSON".parse::<BackendKind>().unwrap(), BackendKind::Json);
        assert_eq!(
            " sqlite ".parse::<BackendKind>().unwrap(),
            BackendKind::Sqlite
        );
    }

    #[test]
    fn backend_kind_rejects_unknown_names() {
        let err = "mysql".parse::<BackendKind>().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn backend_kind_display_roundtrips() {
        for kind in [BackendKind::Csv, BackendKind::Json, BackendKind::Sqlite] {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }
}
