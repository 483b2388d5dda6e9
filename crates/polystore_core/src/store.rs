//! Store facade and backend dispatch.

use crate::config::{BackendConfig, Config};
use crate::error::{StoreError, StoreResult};
use crate::processor::Processor;
use parking_lot::Mutex;
use polystore_providers::{
    field_names, BackendInfo, BackendKind, CsvProvider, Filter, JsonProvider, Provider, RecordSet,
    SqliteProvider, TrimEnd,
};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Lifecycle of a store's provider handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Unconnected,
    Connected,
    Closed,
}

struct Inner {
    provider: Box<dyn Provider>,
    lifecycle: Lifecycle,
}

/// The backend-agnostic entry point for saving and retrieving records.
///
/// A `Store` is constructed from a [`Config`], binds to exactly one backend
/// target, and routes every call to that provider, annotating failures with
/// the backend that produced them. The provider handle is acquired lazily on
/// the first operation and released by [`Store::close`] (or on drop).
///
/// # Lifecycle
///
/// `Unconnected → Connected → Closed`. Operations transparently connect an
/// unconnected store; a closed store rejects them with a state error.
/// `close` is idempotent and terminal - there is no reconnection.
///
/// # Concurrency
///
/// Every operation is a blocking call that runs to completion. A store can
/// be shared behind the caller's own synchronization, but no ordering is
/// promised across concurrent callers; serialize access to keep a
/// predictable record order.
///
/// # Example
///
/// ```rust
/// use polystore_core::{BackendConfig, BackendKind, Config, Record, Store};
///
/// let config = Config::single(BackendConfig::new(BackendKind::Sqlite, ":memory:"));
/// let store = Store::open(&config).unwrap();
///
/// store
///     .save_data(&vec![Record::new().with("id", 1).with("name", "ada")])
///     .unwrap();
/// assert_eq!(store.get_data(None).unwrap().len(), 1);
///
/// store.close();
/// ```
pub struct Store {
    backend: BackendKind,
    target: String,
    location: String,
    processor: Processor,
    inner: Mutex<Inner>,
}

impl Store {
    /// Opens a store bound to the configuration's default target.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the target is missing or its
    /// configuration is invalid. Configuration problems always surface
    /// here, never on first use.
    pub fn open(config: &Config) -> StoreResult<Self> {
        Self::open_target(config, config.default_target())
    }

    /// Opens a store bound to the named target.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no such target is configured or its
    /// configuration is invalid.
    pub fn open_target(config: &Config, target: &str) -> StoreResult<Self> {
        let Some(backend_config) = config.get(target) else {
            return Err(StoreError::configuration(format!(
                "unknown storage target '{target}'"
            )));
        };
        backend_config.validate()?;

        Ok(Self {
            backend: backend_config.backend,
            target: target.to_string(),
            location: backend_config.location.clone(),
            processor: Processor::identity(),
            inner: Mutex::new(Inner {
                provider: build_provider(backend_config),
                lifecycle: Lifecycle::Unconnected,
            }),
        })
    }

    /// Installs a processor on both data paths.
    #[must_use]
    pub fn with_processor(mut self, processor: Processor) -> Self {
        self.processor = processor;
        self
    }

    /// The backend this store is bound to.
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// The configuration target this store is bound to.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The backend's location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Saves records through the active provider, returning the number
    /// written.
    ///
    /// # Errors
    ///
    /// Returns a state error after `close`, a validation error for an empty
    /// record set or a processor rejection, and the provider's own error -
    /// annotated with the backend - for everything else.
    pub fn save_data(&self, records: &RecordSet) -> StoreResult<usize> {
        let mut inner = self.inner.lock();
        if inner.lifecycle == Lifecycle::Closed {
            return Err(StoreError::Closed);
        }
        if records.is_empty() {
            return Err(StoreError::validation("no records to store"));
        }
        self.connect_if_needed(&mut inner)?;
        let prepared = self.processor.normalize(records)?;
        inner
            .provider
            .save_data(&prepared)
            .map_err(|e| self.annotate(e))
    }

    /// Retrieves records, all of them or the subset matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a state error after `close`, the provider's annotated error
    /// on read failure, or a validation error from the processor.
    pub fn get_data(&self, filter: Option<&Filter>) -> StoreResult<RecordSet> {
        let mut inner = self.inner.lock();
        if inner.lifecycle == Lifecycle::Closed {
            return Err(StoreError::Closed);
        }
        self.connect_if_needed(&mut inner)?;
        let rows = inner
            .provider
            .get_data(filter)
            .map_err(|e| self.annotate(e))?;
        self.processor.denormalize(rows)
    }

    /// Removes up to `count` records from the chosen end, returning the
    /// number removed.
    ///
    /// # Errors
    ///
    /// Returns a state error after `close`, or the provider's annotated
    /// error.
    pub fn trim_data(&self, count: usize, end: TrimEnd) -> StoreResult<usize> {
        let mut inner = self.inner.lock();
        if inner.lifecycle == Lifecycle::Closed {
            return Err(StoreError::Closed);
        }
        self.connect_if_needed(&mut inner)?;
        inner
            .provider
            .trim_data(count, end)
            .map_err(|e| self.annotate(e))
    }

    /// Returns backend metadata: kind, location, and record count.
    ///
    /// # Errors
    ///
    /// Returns a state error after `close`, or the provider's annotated
    /// error.
    pub fn describe(&self) -> StoreResult<BackendInfo> {
        let mut inner = self.inner.lock();
        if inner.lifecycle == Lifecycle::Closed {
            return Err(StoreError::Closed);
        }
        self.connect_if_needed(&mut inner)?;
        inner.provider.describe().map_err(|e| self.annotate(e))
    }

    /// Releases the provider handle. Idempotent and terminal: the store
    /// cannot be reconnected afterwards.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.lifecycle == Lifecycle::Closed {
            return;
        }
        if inner.lifecycle == Lifecycle::Connected {
            inner.provider.disconnect();
        }
        inner.lifecycle = Lifecycle::Closed;
        debug!("closed {} store at '{}'", self.backend, self.location);
    }

    /// Returns `true` until the store is closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.lock().lifecycle != Lifecycle::Closed
    }

    /// Returns `true` while a provider handle is held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.lock().lifecycle == Lifecycle::Connected
    }

    fn connect_if_needed(&self, inner: &mut Inner) -> StoreResult<()> {
        if inner.lifecycle == Lifecycle::Connected {
            return Ok(());
        }
        inner.provider.connect().map_err(|e| self.annotate(e))?;
        inner.lifecycle = Lifecycle::Connected;
        debug!("connected to {} backend at '{}'", self.backend, self.location);
        Ok(())
    }

    fn annotate(&self, source: polystore_providers::ProviderError) -> StoreError {
        StoreError::Backend {
            backend: self.backend,
            source,
        }
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend)
            .field("target", &self.target)
            .field("location", &self.location)
            .field("is_open", &self.is_open())
            .finish_non_exhaustive()
    }
}

/// Resolves a backend configuration to its provider. The backend set is
/// closed; this factory is the only place a variant is chosen.
fn build_provider(config: &BackendConfig) -> Box<dyn Provider> {
    let declared = if config.fields.is_empty() {
        None
    } else {
        Some(field_names(&config.fields))
    };
    match config.backend {
        BackendKind::Csv => Box::new(CsvProvider::new(Path::new(&config.location), declared)),
        BackendKind::Json => Box::new(JsonProvider::new(Path::new(&config.location))),
        BackendKind::Sqlite => Box::new(SqliteProvider::new(
            config.location.clone(),
            config.table.clone(),
            config.fields.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_providers::{ErrorKind, Record, Value};
    use tempfile::tempdir;

    fn memory_store() -> Store {
        let config = Config::single(BackendConfig::new(BackendKind::Sqlite, ":memory:"));
        Store::open(&config).unwrap()
    }

    fn sample() -> RecordSet {
        vec![
            Record::new().with("id", 1).with("name", "a"),
            Record::new().with("id", 2).with("name", "b"),
        ]
    }

    #[test]
    fn unknown_target_rejected_at_construction() {
        let config = Config::single(BackendConfig::new(BackendKind::Csv, "a.csv"));
        let err = Store::open_target(&config, "archive").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn invalid_backend_config_rejected_at_construction() {
        let config = Config::single(BackendConfig::new(BackendKind::Csv, ""));
        let err = Store::open(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn connects_lazily_on_first_use() {
        let store = memory_store();
        assert!(!store.is_connected());
        store.save_data(&sample()).unwrap();
        assert!(store.is_connected());
    }

    #[test]
    fn saves_and_gets_through_the_provider() {
        let store = memory_store();
        assert_eq!(store.save_data(&sample()).unwrap(), 2);
        assert_eq!(store.get_data(None).unwrap(), sample());

        let rows = store.get_data(Some(&Filter::equals("id", 2))).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::Text("b".into())));
    }

    #[test]
    fn empty_record_set_rejected() {
        let store = memory_store();
        let err = store.save_data(&Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn closed_store_rejects_operations() {
        let store = memory_store();
        store.save_data(&sample()).unwrap();
        store.close();
        assert!(!store.is_open());

        assert_eq!(store.get_data(None).unwrap_err().kind(), ErrorKind::State);
        assert_eq!(
            store.save_data(&sample()).unwrap_err().kind(),
            ErrorKind::State
        );
        assert_eq!(store.describe().unwrap_err().kind(), ErrorKind::State);

        // Second close is a no-op, not an error.
        store.close();
        assert!(!store.is_open());
    }

    #[test]
    fn provider_errors_carry_the_backend_name() {
        let dir = tempdir().unwrap();
        // A directory is not a valid CSV file location.
        let config = Config::single(BackendConfig::new(
            BackendKind::Csv,
            dir.path().display().to_string(),
        ));
        let store = Store::open(&config).unwrap();

        let err = store.save_data(&sample()).unwrap_err();
        assert_eq!(err.backend(), Some(BackendKind::Csv));
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn processor_runs_on_both_paths() {
        use polystore_providers::{FieldKind, FieldSpec};

        let dir = tempdir().unwrap();
        let fields = vec![
            FieldSpec::new("id", FieldKind::Int),
            FieldSpec::new("name", FieldKind::Text),
        ];
        let config = Config::single(
            BackendConfig::new(
                BackendKind::Csv,
                dir.path().join("out.csv").display().to_string(),
            )
            .fields(fields.clone()),
        );
        let store = Store::open(&config)
            .unwrap()
            .with_processor(Processor::with_fields(fields).coerce(true));

        store.save_data(&sample()).unwrap();
        // CSV stores text, but the processor coerces it back on read.
        assert_eq!(store.get_data(None).unwrap(), sample());
    }

    #[test]
    fn trim_and_describe_pass_through() {
        let store = memory_store();
        store.save_data(&sample()).unwrap();

        let info = store.describe().unwrap();
        assert_eq!(info.kind, BackendKind::Sqlite);
        assert_eq!(info.records, 2);

        assert_eq!(store.trim_data(1, TrimEnd::Oldest).unwrap(), 1);
        assert_eq!(store.describe().unwrap().records, 1);
    }

    #[test]
    fn binds_to_named_target() {
        let dir = tempdir().unwrap();
        let config = Config::new()
            .with_target(
                "primary",
                BackendConfig::new(BackendKind::Sqlite, ":memory:"),
            )
            .with_target(
                "archive",
                BackendConfig::new(
                    BackendKind::Json,
                    dir.path().join("archive.json").display().to_string(),
                ),
            );

        let store = Store::open_target(&config, "archive").unwrap();
        assert_eq!(store.backend(), BackendKind::Json);
        assert_eq!(store.target(), "archive");
        store.save_data(&sample()).unwrap();
        assert!(dir.path().join("archive.json").exists());
    }
}
