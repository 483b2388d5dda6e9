//! # polystore core
//!
//! Backend-agnostic data store facade.
//!
//! This crate provides:
//! - [`Store`] - the single entry point for `save_data` / `get_data`
//! - [`Config`] - immutable, multi-target backend configuration
//! - [`Processor`] - optional record normalization between store and backend
//! - [`StoreError`] - provider failures annotated with their backend origin
//!
//! Backends themselves (CSV, JSON, SQLite) live in `polystore_providers`;
//! their types are re-exported here so applications need only this crate.
//!
//! ## Example
//!
//! ```rust
//! use polystore_core::{BackendConfig, BackendKind, Config, Record, Store};
//!
//! let config = Config::single(BackendConfig::new(BackendKind::Sqlite, ":memory:"));
//! let store = Store::open(&config).unwrap();
//!
//! let records = vec![
//!     Record::new().with("id", 1).with("name", "ada"),
//!     Record::new().with("id", 2).with("name", "grace"),
//! ];
//! store.save_data(&records).unwrap();
//! assert_eq!(store.get_data(None).unwrap(), records);
//!
//! store.close();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod processor;
mod store;

pub use config::{BackendConfig, Config, DEFAULT_TABLE, DEFAULT_TARGET};
pub use error::{StoreError, StoreResult};
pub use processor::Processor;
pub use store::Store;

pub use polystore_providers::{
    field_names, BackendInfo, BackendKind, ErrorKind, FieldKind, FieldSpec, Filter, Record,
    RecordSet, TrimEnd, Value,
};
