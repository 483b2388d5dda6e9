//! Record and value types exchanged with storage providers.

use crate::error::{ProviderError, ProviderResult};
use serde_json::Value as JsonValue;
use std::fmt;

/// A scalar field value.
///
/// Records carry only scalars: nested structures are not part of the storage
/// contract and are rejected when encountered in a backend document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / unknown value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
}

impl Value {
    /// Returns a short name for the value's type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }

    /// Returns `true` if the value is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts to the JSON representation.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::Number((*i).into()),
            // Non-finite floats have no JSON form.
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Text(s) => JsonValue::String(s.clone()),
        }
    }

    /// Converts from a JSON scalar.
    ///
    /// # Errors
    ///
    /// Returns a validation error for arrays and objects.
    pub fn from_json(value: &JsonValue) -> ProviderResult<Self> {
        match value {
            JsonValue::Null => Ok(Self::Null),
            JsonValue::Bool(b) => Ok(Self::Bool(*b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else {
                    Ok(Self::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            JsonValue::String(s) => Ok(Self::Text(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => Err(ProviderError::validation(
                "nested values are not supported in records",
            )),
        }
    }
}

impl fmt::Display for Value {
    /// Textual form, as written to CSV cells. `Null` renders empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One logical row or document: an ordered field-name to value mapping.
///
/// Field order is significant. It establishes the CSV column order and is
/// preserved through JSON documents, so two records with the same names in a
/// different order do not have the same shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; replaces the value if the field already exists.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Inserts or replaces a field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `true` if the record's field names equal `names`, in order.
    #[must_use]
    pub fn matches_fields(&self, names: &[String]) -> bool {
        self.fields.len() == names.len()
            && self.fields.iter().zip(names).all(|((n, _), want)| n == want)
    }

    /// Converts to a JSON object, preserving field order.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let mut map = serde_json::Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_json());
        }
        JsonValue::Object(map)
    }

    /// Converts from a JSON object of scalars.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `value` is not an object or contains
    /// nested values.
    pub fn from_json(value: &JsonValue) -> ProviderResult<Self> {
        let JsonValue::Object(map) = value else {
            return Err(ProviderError::validation(format!(
                "expected a JSON object, got {value}"
            )));
        };
        let mut record = Self::new();
        for (name, raw) in map {
            record.set(name.clone(), Value::from_json(raw)?);
        }
        Ok(record)
    }
}

/// An ordered collection of records, the unit of exchange for save/get calls.
pub type RecordSet = Vec<Record>;

/// An equality filter on a single field.
///
/// A record matches when its value for the field equals the filter value, or
/// when the two values have the same textual form. The textual fallback keeps
/// filters portable across backends: CSV reads every cell as text and SQLite
/// applies column affinity to comparison operands, so `id = "1"` and `id = 1`
/// select the same rows everywhere.
#[derive(Debug, Clone)]
pub struct Filter {
    field: String,
    value: Value,
}

impl Filter {
    /// Creates an equality filter.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// The field being compared.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The value compared against.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns `true` if `record` satisfies the filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match record.get(&self.field) {
            Some(v) => *v == self.value || v.to_string() == self.value.to_string(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_preserves_insertion_order() {
        let mut rec = Record::new().with("id", 1).with("name", "a");
        rec.set("id", 2);
        let names: Vec<&str> = rec.field_names().collect();
        assert_eq!(names, ["id", "name"]);
        assert_eq!(rec.get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn matches_fields_is_order_sensitive() {
        let rec = Record::new().with("id", 1).with("name", "a");
        assert!(rec.matches_fields(&["id".into(), "name".into()]));
        assert!(!rec.matches_fields(&["name".into(), "id".into()]));
        assert!(!rec.matches_fields(&["id".into()]));
    }

    #[test]
    fn json_roundtrip_preserves_order_and_types() {
        let rec = Record::new()
            .with("id", 7)
            .with("score", 1.5)
            .with("ok", true)
            .with("note", Value::Null)
            .with("name", "bob");
        let back = Record::from_json(&rec.to_json()).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn nested_json_rejected() {
        let doc: JsonValue = serde_json::json!({"a": {"b": 1}});
        let err = Record::from_json(&doc).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn filter_matches_textually() {
        let rec = Record::new().with("id", "1").with("name", "a");
        assert!(Filter::equals("id", 1).matches(&rec));
        assert!(Filter::equals("name", "a").matches(&rec));
        assert!(!Filter::equals("name", "b").matches(&rec));
        assert!(!Filter::equals("missing", "a").matches(&rec));
    }

    #[test]
    fn null_renders_empty() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Text("x".into()).to_string(), "x");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }
}
