//! Store configuration.
//!
//! A [`Config`] is an immutable set of named backend targets built once by
//! the caller (typically the CLI or an application's setup code) and handed
//! to [`crate::Store::open`]. The store only reads it; there is no
//! process-wide configuration state.

use crate::error::{StoreError, StoreResult};
use polystore_providers::{BackendKind, FieldSpec};

/// Name of the target a [`Config`] binds to when none is chosen explicitly.
pub const DEFAULT_TARGET: &str = "primary";

/// Default SQLite table name when none is configured.
pub const DEFAULT_TABLE: &str = "records";

/// Connection and layout details for one backend target.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Which backend to use.
    pub backend: BackendKind,
    /// File path, or connection string (`:memory:` for ephemeral SQLite).
    pub location: String,
    /// Table name, used by the SQLite backend.
    pub table: String,
    /// Declared field layout; empty means inferred from the first record.
    pub fields: Vec<FieldSpec>,
    /// Text encoding of file-based media. Only UTF-8 is supported.
    pub encoding: String,
}

impl BackendConfig {
    /// Creates a configuration for `backend` at `location` with defaults for
    /// everything else.
    pub fn new(backend: BackendKind, location: impl Into<String>) -> Self {
        Self {
            backend,
            location: location.into(),
            table: DEFAULT_TABLE.to_string(),
            fields: Vec::new(),
            encoding: "utf-8".to_string(),
        }
    }

    /// Sets the SQLite table name.
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Sets the declared field layout.
    #[must_use]
    pub fn fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the text encoding.
    #[must_use]
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Checks that required fields are present and supported.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty location or table, or an
    /// encoding other than UTF-8.
    pub fn validate(&self) -> StoreResult<()> {
        if self.location.trim().is_empty() {
            return Err(StoreError::configuration(format!(
                "missing location for {} backend",
                self.backend
            )));
        }
        if self.backend == BackendKind::Sqlite && self.table.trim().is_empty() {
            return Err(StoreError::configuration(
                "missing table name for sqlite backend",
            ));
        }
        let enc = self.encoding.trim();
        if !(enc.eq_ignore_ascii_case("utf-8") || enc.eq_ignore_ascii_case("utf8")) {
            return Err(StoreError::configuration(format!(
                "unsupported encoding '{enc}', only UTF-8 is supported"
            )));
        }
        Ok(())
    }
}

/// An immutable set of named backend targets.
///
/// A configuration may describe several targets (say `"primary"` and
/// `"archive"`); each [`crate::Store`] instance binds to exactly one of them
/// at construction.
#[derive(Debug, Clone, Default)]
pub struct Config {
    targets: Vec<(String, BackendConfig)>,
    default_target: Option<String>,
}

impl Config {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with one target named [`DEFAULT_TARGET`].
    #[must_use]
    pub fn single(backend: BackendConfig) -> Self {
        Self::new().with_target(DEFAULT_TARGET, backend)
    }

    /// Adds or replaces a named target.
    #[must_use]
    pub fn with_target(mut self, name: impl Into<String>, backend: BackendConfig) -> Self {
        let name = name.into();
        self.targets.retain(|(n, _)| *n != name);
        self.targets.push((name, backend));
        self
    }

    /// Sets the target used by [`crate::Store::open`].
    #[must_use]
    pub fn with_default_target(mut self, name: impl Into<String>) -> Self {
        self.default_target = Some(name.into());
        self
    }

    /// Returns the named target, if configured.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BackendConfig> {
        self.targets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// The name of the default target.
    #[must_use]
    pub fn default_target(&self) -> &str {
        self.default_target.as_deref().unwrap_or(DEFAULT_TARGET)
    }

    /// Names of all configured targets, in declaration order.
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|(n, _)| n.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_binds_the_primary_target() {
        let config = Config::single(BackendConfig::new(BackendKind::Json, "data.json"));
        assert_eq!(config.default_target(), DEFAULT_TARGET);
        assert_eq!(config.get("primary").unwrap().backend, BackendKind::Json);
        assert!(config.get("archive").is_none());
    }

    #[test]
    fn with_target_replaces_same_name() {
        let config = Config::new()
            .with_target("primary", BackendConfig::new(BackendKind::Csv, "a.csv"))
            .with_target("primary", BackendConfig::new(BackendKind::Json, "a.json"));
        assert_eq!(config.target_names().count(), 1);
        assert_eq!(config.get("primary").unwrap().backend, BackendKind::Json);
    }

    #[test]
    fn default_target_can_be_redirected() {
        let config = Config::new()
            .with_target("primary", BackendConfig::new(BackendKind::Csv, "a.csv"))
            .with_target("archive", BackendConfig::new(BackendKind::Json, "a.json"))
            .with_default_target("archive");
        assert_eq!(config.default_target(), "archive");
    }

    #[test]
    fn validate_rejects_empty_location() {
        let backend = BackendConfig::new(BackendKind::Csv, "  ");
        assert!(backend.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_encoding() {
        let backend = BackendConfig::new(BackendKind::Csv, "a.csv").encoding("latin-1");
        assert!(backend.validate().is_err());

        let backend = BackendConfig::new(BackendKind::Csv, "a.csv").encoding("UTF8");
        assert!(backend.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_sqlite_table() {
        let backend = BackendConfig::new(BackendKind::Sqlite, ":memory:").table("");
        assert!(backend.validate().is_err());
    }
}
