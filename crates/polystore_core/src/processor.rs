//! Record normalization between the store and its provider.

use crate::error::{StoreError, StoreResult};
use polystore_providers::{FieldKind, FieldSpec, Record, RecordSet, Value};

/// Backend-independent record transformation stage.
///
/// A processor sits between the store and its provider on both paths:
/// [`Processor::normalize`] runs before a write, [`Processor::denormalize`]
/// after a read. With no declared fields it is an identity transform.
///
/// With a declared layout, normalization rebuilds each record in declared
/// field order and can additionally drop undeclared fields, fill declared
/// defaults for missing ones, and coerce values to their declared kinds.
/// Denormalization applies only the coercion, turning backend-native values
/// (CSV text cells, SQLite 0/1 booleans) back into the declared kinds.
///
/// Null values pass through untouched in both directions.
#[derive(Debug, Clone, Default)]
pub struct Processor {
    fields: Vec<FieldSpec>,
    drop_unknown: bool,
    fill_defaults: bool,
    coerce: bool,
}

impl Processor {
    /// Creates the identity processor.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Creates a processor with a declared field layout and all behaviors
    /// disabled; enable them with the builder methods.
    #[must_use]
    pub fn with_fields(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Drops fields that are not declared, on the write path.
    #[must_use]
    pub fn drop_unknown(mut self, enabled: bool) -> Self {
        self.drop_unknown = enabled;
        self
    }

    /// Fills declared defaults for missing fields, on the write path.
    #[must_use]
    pub fn fill_defaults(mut self, enabled: bool) -> Self {
        self.fill_defaults = enabled;
        self
    }

    /// Coerces values to their declared kinds, on both paths.
    #[must_use]
    pub fn coerce(mut self, enabled: bool) -> Self {
        self.coerce = enabled;
        self
    }

    fn declared(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|s| s.name == name)
    }

    /// Transforms records on their way to the provider.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a value cannot be coerced to its
    /// declared kind.
    pub fn normalize(&self, records: &[Record]) -> StoreResult<RecordSet> {
        if self.fields.is_empty() {
            return Ok(records.to_vec());
        }
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            let mut rebuilt = Record::new();
            for spec in &self.fields {
                match record.get(&spec.name) {
                    Some(value) => {
                        let value = if self.coerce {
                            coerce_value(&spec.name, value, spec.kind)?
                        } else {
                            value.clone()
                        };
                        rebuilt.set(spec.name.clone(), value);
                    }
                    None => {
                        if self.fill_defaults {
                            if let Some(default) = &spec.default {
                                rebuilt.set(spec.name.clone(), default.clone());
                            }
                        }
                    }
                }
            }
            if !self.drop_unknown {
                for (name, value) in record.iter() {
                    if self.declared(name).is_none() {
                        rebuilt.set(name.to_string(), value.clone());
                    }
                }
            }
            out.push(rebuilt);
        }
        Ok(out)
    }

    /// Transforms records on their way back from the provider.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a value cannot be coerced to its
    /// declared kind.
    pub fn denormalize(&self, records: RecordSet) -> StoreResult<RecordSet> {
        if self.fields.is_empty() || !self.coerce {
            return Ok(records);
        }
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            let mut rebuilt = Record::new();
            for (name, value) in record.iter() {
                let value = match self.declared(name) {
                    Some(spec) => coerce_value(name, value, spec.kind)?,
                    None => value.clone(),
                };
                rebuilt.set(name.to_string(), value);
            }
            out.push(rebuilt);
        }
        Ok(out)
    }
}

fn coerce_value(name: &str, value: &Value, kind: FieldKind) -> StoreResult<Value> {
    let fail = || {
        StoreError::validation(format!(
            "cannot coerce field '{name}' value '{value}' ({}) to {kind:?}",
            value.type_name()
        ))
    };
    match (kind, value) {
        (_, Value::Null) => Ok(Value::Null),
        (FieldKind::Text, Value::Text(_)) => Ok(value.clone()),
        (FieldKind::Text, other) => Ok(Value::Text(other.to_string())),
        (FieldKind::Int, Value::Int(_)) => Ok(value.clone()),
        (FieldKind::Int, Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
        (FieldKind::Int, Value::Float(f)) => {
            if f.is_finite() && f.fract() == 0.0 {
                Ok(Value::Int(*f as i64))
            } else {
                Err(fail())
            }
        }
        (FieldKind::Int, Value::Text(s)) => {
            s.trim().parse::<i64>().map(Value::Int).map_err(|_| fail())
        }
        (FieldKind::Float, Value::Float(_)) => Ok(value.clone()),
        (FieldKind::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
        (FieldKind::Float, Value::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| fail()),
        (FieldKind::Float, Value::Bool(_)) => Err(fail()),
        (FieldKind::Bool, Value::Bool(_)) => Ok(value.clone()),
        (FieldKind::Bool, Value::Int(0)) => Ok(Value::Bool(false)),
        (FieldKind::Bool, Value::Int(1)) => Ok(Value::Bool(true)),
        (FieldKind::Bool, Value::Int(_)) => Err(fail()),
        (FieldKind::Bool, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(fail()),
        },
        (FieldKind::Bool, Value::Float(_)) => Err(fail()),
    }
}
