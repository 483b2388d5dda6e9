//! Declared field layouts.
//!
//! A field layout is optional: providers infer the schema from the first
//! record when no layout is declared. Declaring one pins the column order,
//! drives SQLite column types and secondary indexes, and feeds the processor's
//! coercion and default-filling stages.

use crate::error::{ProviderError, ProviderResult};
use crate::record::Value;

/// The declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 text.
    Text,
    /// Signed integer.
    Int,
    /// Floating-point number.
    Float,
    /// Boolean.
    Bool,
}

impl FieldKind {
    /// Parses a kind name. Accepts the short forms used in textual field
    /// maps (`str`, `int`, `float`, `bool`) and common synonyms.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown name.
    pub fn parse(name: &str) -> ProviderResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "str" | "string" | "text" => Ok(Self::Text),
            "int" | "integer" => Ok(Self::Int),
            "float" | "real" => Ok(Self::Float),
            "bool" | "boolean" => Ok(Self::Bool),
            other => Err(ProviderError::configuration(format!(
                "unknown field kind '{other}'"
            ))),
        }
    }

    /// The SQLite column type used for this kind.
    #[must_use]
    pub fn sqlite_type(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Int => "INTEGER",
            Self::Float => "REAL",
            Self::Bool => "NUMERIC",
        }
    }
}

/// One declared field: name, type, and optional index/default markers.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,
    /// Declared type.
    pub kind: FieldKind,
    /// Whether the SQLite provider creates a secondary index on this field.
    pub indexed: bool,
    /// Default value filled in by the processor when the field is missing.
    pub default: Option<Value>,
}

impl FieldSpec {
    /// Creates a spec with no index and no default.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: false,
            default: None,
        }
    }

    /// Marks the field as indexed.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Parses a textual field map of the form `"name:kind|name:kind"`.
    ///
    /// A kind with an `idx` suffix (`strIDX`, `intIDX`) marks the field as
    /// indexed.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a malformed entry or unknown kind.
    pub fn parse_map(map: &str) -> ProviderResult<Vec<Self>> {
        let mut specs = Vec::new();
        for entry in map.split('|').filter(|e| !e.trim().is_empty()) {
            let Some((name, kind)) = entry.split_once(':') else {
                return Err(ProviderError::configuration(format!(
                    "malformed field map entry '{entry}', expected 'name:kind'"
                )));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(ProviderError::configuration(format!(
                    "empty field name in map entry '{entry}'"
                )));
            }
            let kind = kind.trim();
            let (kind, indexed) = match kind.to_ascii_lowercase().strip_suffix("idx") {
                Some(base) => (FieldKind::parse(base)?, true),
                None => (FieldKind::parse(kind)?, false),
            };
            let mut spec = Self::new(name, kind);
            spec.indexed = indexed;
            specs.push(spec);
        }
        Ok(specs)
    }
}

/// Extracts the declared field names, in order.
#[must_use]
pub fn field_names(specs: &[FieldSpec]) -> Vec<String> {
    specs.iter().map(|s| s.name.clone()).collect()
}
