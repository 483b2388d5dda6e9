//! # polystore providers
//!
//! Storage provider trait and backend implementations for polystore.
//!
//! This crate defines the capability contract every backend satisfies -
//! connect, disconnect, save, get, trim, describe - together with the record
//! data model and the closed error taxonomy shared by all providers.
//!
//! ## Design Principles
//!
//! - Providers exchange [`Record`]s, ordered field-to-value mappings; they do
//!   not interpret caller semantics beyond the schema snapshot.
//! - The backend set is closed ([`BackendKind`]); selection happens once, in
//!   the store's factory, not through runtime plugin loading.
//! - Failures are classified into the closed [`ErrorKind`] set at the point
//!   of occurrence and never retried internally.
//!
//! ## Available Providers
//!
//! - [`CsvProvider`] - append-only flat file with a header row
//! - [`JsonProvider`] - document file, atomically rewritten on save
//! - [`SqliteProvider`] - embedded SQL database
//!
//! ## Example
//!
//! ```rust
//! use polystore_providers::{CsvProvider, Provider, Record};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut provider = CsvProvider::new(&dir.path().join("data.csv"), None);
//! provider.connect().unwrap();
//! provider
//!     .save_data(&[Record::new().with("id", 1).with("name", "ada")])
//!     .unwrap();
//! assert_eq!(provider.get_data(None).unwrap().len(), 1);
//! provider.disconnect();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod csv;
mod error;
mod json;
mod provider;
mod record;
mod schema;
mod sqlite;

pub use self::csv::CsvProvider;
pub use error::{ErrorKind, ProviderError, ProviderResult};
pub use json::JsonProvider;
pub use provider::{BackendInfo, BackendKind, Provider, TrimEnd};
pub use record::{Filter, Record, RecordSet, Value};
pub use schema::{field_names, FieldKind, FieldSpec};
pub use sqlite::SqliteProvider;
