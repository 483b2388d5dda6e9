//! Embedded SQLite storage provider.

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BackendInfo, BackendKind, Provider, TrimEnd};
use crate::record::{Filter, Record, RecordSet, Value};
use crate::schema::FieldSpec;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

/// Embedded SQLite database storage.
///
/// Records go into a single configured table. The table is created on first
/// save if absent, with column types taken from the declared field layout or
/// inferred from the first record (`Int` → INTEGER, `Float` → REAL,
/// `Bool` → NUMERIC, `Text` and `Null` → TEXT). The column set is the schema
/// snapshot for the handle's lifetime: a record introducing a field outside
/// it is rejected, while missing fields insert NULL.
///
/// Booleans are stored as 0/1 and read back as integers unless a processor
/// coerces them. Each save call runs in one transaction, so a failed call
/// inserts nothing; rows from earlier calls stay committed.
///
/// `get_data` returns rows in rowid order, which is insertion order for an
/// append-only table. Reading before the table exists yields an empty set.
///
/// The location is a database file path, or `:memory:` for an ephemeral
/// database living only as long as the handle.
#[derive(Debug)]
pub struct SqliteProvider {
    location: String,
    table: String,
    declared: Vec<FieldSpec>,
    conn: Option<Connection>,
    columns: Option<Vec<String>>,
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl SqliteProvider {
    /// Creates a provider for the database at `location`, storing records in
    /// `table`. An empty `declared` layout means types are inferred from the
    /// first record.
    pub fn new(
        location: impl Into<String>,
        table: impl Into<String>,
        declared: Vec<FieldSpec>,
    ) -> Self {
        Self {
            location: location.into(),
            table: table.into(),
            declared,
            conn: None,
            columns: None,
        }
    }

    /// Returns the database location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Option<Vec<String>>> {
        let exists: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(names))
    }

    /// Creates the table (and declared indexes) if this handle has no column
    /// snapshot yet, deriving the layout from `first` when nothing was
    /// declared.
    fn ensure_table(&mut self, first: &Record) -> ProviderResult<()> {
        if self.columns.is_some() {
            return Ok(());
        }
        let Some(conn) = self.conn.as_ref() else {
            return Err(ProviderError::state("sqlite provider is not connected"));
        };

        let layout: Vec<(String, &'static str)> = if self.declared.is_empty() {
            first
                .iter()
                .map(|(name, value)| {
                    let sql_type = match value {
                        Value::Int(_) => "INTEGER",
                        Value::Float(_) => "REAL",
                        Value::Bool(_) => "NUMERIC",
                        Value::Text(_) | Value::Null => "TEXT",
                    };
                    (name.to_string(), sql_type)
                })
                .collect()
        } else {
            self.declared
                .iter()
                .map(|spec| (spec.name.clone(), spec.kind.sqlite_type()))
                .collect()
        };
        if layout.is_empty() {
            return Err(ProviderError::validation("record has no fields"));
        }

        let columns = layout
            .iter()
            .map(|(name, sql_type)| format!("{} {sql_type}", quote_ident(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({columns})",
            quote_ident(&self.table)
        );
        conn.execute(&sql, []).map_err(|e| {
            ProviderError::write(format!("unable to create table '{}': {e}", self.table))
        })?;

        for spec in self.declared.iter().filter(|s| s.indexed) {
            let sql = format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote_ident(&format!("idx_{}_{}", self.table, spec.name)),
                quote_ident(&self.table),
                quote_ident(&spec.name)
            );
            conn.execute(&sql, []).map_err(|e| {
                ProviderError::write(format!(
                    "unable to create index on '{}.{}': {e}",
                    self.table, spec.name
                ))
            })?;
        }

        self.columns = Some(layout.into_iter().map(|(name, _)| name).collect());
        Ok(())
    }
}

impl Provider for SqliteProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn connect(&mut self) -> ProviderResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = Connection::open(&self.location).map_err(|e| {
            ProviderError::connection(format!(
                "unable to open sqlite database '{}': {e}",
                self.location
            ))
        })?;
        // Column snapshot for this handle, if the table already exists.
        self.columns = Self::table_columns(&conn, &self.table).map_err(|e| {
            ProviderError::connection(format!(
                "unable to inspect table '{}' in '{}': {e}",
                self.table, self.location
            ))
        })?;
        self.conn = Some(conn);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!("failed to close sqlite database '{}': {e}", self.location);
            }
        }
        self.columns = None;
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn save_data(&mut self, records: &[Record]) -> ProviderResult<usize> {
        if self.conn.is_none() {
            return Err(ProviderError::state("sqlite provider is not connected"));
        }
        if records.is_empty() {
            return Err(ProviderError::validation("no records to store"));
        }
        self.ensure_table(&records[0])?;
        let columns = self.columns.clone().unwrap_or_default();

        // Validate the whole batch before touching the table; combined with
        // the per-call transaction below, a failed call inserts nothing.
        for (i, record) in records.iter().enumerate() {
            if record.is_empty() {
                return Err(ProviderError::validation(format!("record {i} has no fields")));
            }
            for name in record.field_names() {
                if !columns.iter().any(|c| c == name) {
                    return Err(ProviderError::validation(format!(
                        "record {i} field '{name}' is not a column of table '{}'",
                        self.table
                    )));
                }
            }
        }

        let table = quote_ident(&self.table);
        let table_name = self.table.clone();
        let Some(conn) = self.conn.as_mut() else {
            return Err(ProviderError::state("sqlite provider is not connected"));
        };
        let tx = conn.transaction().map_err(|e| {
            ProviderError::write(format!("unable to begin transaction on '{table_name}': {e}"))
        })?;
        for record in records {
            let names: Vec<&str> = record.field_names().collect();
            let cols = names
                .iter()
                .map(|n| quote_ident(n))
                .collect::<Vec<_>>()
                .join(", ");
            let marks = (1..=names.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("INSERT INTO {table} ({cols}) VALUES ({marks})");
            let values: Vec<&Value> = record.iter().map(|(_, v)| v).collect();
            tx.execute(&sql, rusqlite::params_from_iter(values))
                .map_err(|e| {
                    ProviderError::write(format!(
                        "unable to insert into table '{table_name}': {e}"
                    ))
                })?;
        }
        tx.commit().map_err(|e| {
            ProviderError::write(format!("unable to commit to table '{table_name}': {e}"))
        })?;
        Ok(records.len())
    }

    fn get_data(&mut self, filter: Option<&Filter>) -> ProviderResult<RecordSet> {
        let Some(conn) = self.conn.as_ref() else {
            return Err(ProviderError::state("sqlite provider is not connected"));
        };
        let Some(columns) = self.columns.as_ref() else {
            // Table not created yet: nothing stored.
            return Ok(Vec::new());
        };
        if let Some(f) = filter {
            if !columns.iter().any(|c| c == f.field()) {
                return Ok(Vec::new());
            }
        }

        let table = quote_ident(&self.table);
        let table_name = &self.table;
        let sql = match filter {
            Some(f) => format!(
                "SELECT * FROM {table} WHERE {} = ?1 ORDER BY rowid",
                quote_ident(f.field())
            ),
            None => format!("SELECT * FROM {table} ORDER BY rowid"),
        };
        let params: Vec<&Value> = match filter {
            Some(f) => vec![f.value()],
            None => Vec::new(),
        };

        let mut stmt = conn.prepare(&sql).map_err(|e| {
            ProviderError::read(format!("unable to query table '{table_name}': {e}"))
        })?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = stmt
            .query(rusqlite::params_from_iter(params))
            .map_err(|e| {
                ProviderError::read(format!("unable to query table '{table_name}': {e}"))
            })?;

        let mut out = Vec::new();
        loop {
            let row = rows.next().map_err(|e| {
                ProviderError::read(format!("unable to read row from '{table_name}': {e}"))
            })?;
            let Some(row) = row else { break };
            let mut record = Record::new();
            for (i, name) in names.iter().enumerate() {
                let value = match row.get_ref(i).map_err(|e| {
                    ProviderError::read(format!(
                        "unable to read column '{name}' from '{table_name}': {e}"
                    ))
                })? {
                    ValueRef::Null => Value::Null,
                    ValueRef::Integer(v) => Value::Int(v),
                    ValueRef::Real(v) => Value::Float(v),
                    ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
                    ValueRef::Blob(_) => {
                        return Err(ProviderError::read(format!(
                            "column '{name}' holds a BLOB, which records do not support"
                        )))
                    }
                };
                record.set(name.clone(), value);
            }
            out.push(record);
        }
        Ok(out)
    }

    fn trim_data(&mut self, count: usize, end: TrimEnd) -> ProviderResult<usize> {
        let Some(conn) = self.conn.as_ref() else {
            return Err(ProviderError::state("sqlite provider is not connected"));
        };
        if self.columns.is_none() || count == 0 {
            return Ok(0);
        }
        let table = quote_ident(&self.table);
        let order = match end {
            TrimEnd::Oldest => "ASC",
            TrimEnd::Newest => "DESC",
        };
        let sql = format!(
            "DELETE FROM {table} WHERE rowid IN \
             (SELECT rowid FROM {table} ORDER BY rowid {order} LIMIT ?1)"
        );
        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        conn.execute(&sql, [limit]).map_err(|e| {
            ProviderError::write(format!("unable to trim table '{}': {e}", self.table))
        })
    }

    fn describe(&self) -> ProviderResult<BackendInfo> {
        let Some(conn) = self.conn.as_ref() else {
            return Err(ProviderError::state("sqlite provider is not connected"));
        };
        let records = match self.columns {
            None => 0,
            Some(_) => {
                let count: i64 = conn
                    .query_row(
                        &format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table)),
                        [],
                        |row| row.get(0),
                    )
                    .map_err(|e| {
                        ProviderError::read(format!(
                            "unable to count records in table '{}': {e}",
                            self.table
                        ))
                    })?;
                usize::try_from(count).unwrap_or_default()
            }
        };
        Ok(BackendInfo {
            kind: BackendKind::Sqlite,
            location: self.location.clone(),
            records,
        })
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::FieldKind;
    use tempfile::tempdir;

    fn memory(table: &str) -> SqliteProvider {
        let mut provider = SqliteProvider::new(":memory:", table, Vec::new());
        provider.connect().unwrap();
        provider
    }

    fn sample() -> Vec<Record> {
        vec![
            Record::new().with("id", 1).with("name", "a").with("score", 1.5),
            Record::new().with("id", 2).with("name", "b").with("score", 2.5),
        ]
    }

    #[test]
    fn creates_table_and_round_trips() {
        let mut provider = memory("events");
        assert_eq!(provider.save_data(&sample()).unwrap(), 2);
        assert_eq!(provider.get_data(None).unwrap(), sample());
    }

    #[test]
    fn null_and_bool_storage() {
        let mut provider = memory("events");
        provider
            .save_data(&[Record::new()
                .with("id", 1)
                .with("active", true)
                .with("note", Value::Null)])
            .unwrap();

        let rows = provider.get_data(None).unwrap();
        // Booleans come back as integers; NULL survives.
        assert_eq!(rows[0].get("active"), Some(&Value::Int(1)));
        assert_eq!(rows[0].get("note"), Some(&Value::Null));
    }

    #[test]
    fn extra_field_rejected_and_prior_rows_kept() {
        let mut provider = memory("events");
        provider
            .save_data(&[Record::new().with("id", 1).with("name", "a")])
            .unwrap();

        let err = provider
            .save_data(&[Record::new()
                .with("id", 2)
                .with("name", "b")
                .with("extra", "x")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let rows = provider.get_data(None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn failed_batch_inserts_nothing() {
        let mut provider = memory("events");
        provider
            .save_data(&[Record::new().with("id", 1).with("name", "a")])
            .unwrap();

        let batch = vec![
            Record::new().with("id", 2).with("name", "b"),
            Record::new().with("id", 3).with("oops", "x"),
        ];
        assert!(provider.save_data(&batch).is_err());
        assert_eq!(provider.get_data(None).unwrap().len(), 1);
    }

    #[test]
    fn missing_fields_insert_null() {
        let mut provider = memory("events");
        provider
            .save_data(&[Record::new().with("id", 1).with("name", "a")])
            .unwrap();
        provider
            .save_data(&[Record::new().with("id", 2)])
            .unwrap();

        let rows = provider.get_data(None).unwrap();
        assert_eq!(rows[1].get("name"), Some(&Value::Null));
    }

    #[test]
    fn get_before_table_exists_is_empty() {
        let mut provider = memory("events");
        assert!(provider.get_data(None).unwrap().is_empty());
        assert_eq!(provider.describe().unwrap().records, 0);
    }

    #[test]
    fn empty_record_set_rejected() {
        let mut provider = memory("events");
        let err = provider.save_data(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn filter_matches_typed_and_textual_values() {
        let mut provider = memory("events");
        provider.save_data(&sample()).unwrap();

        let rows = provider
            .get_data(Some(&Filter::equals("id", 2)))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::Text("b".into())));

        // Column affinity converts a textual operand for an INTEGER column.
        let rows = provider
            .get_data(Some(&Filter::equals("id", "2")))
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn filter_on_unknown_field_is_empty() {
        let mut provider = memory("events");
        provider.save_data(&sample()).unwrap();
        let rows = provider
            .get_data(Some(&Filter::equals("ghost", 1)))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn trim_oldest_and_newest() {
        let mut provider = memory("events");
        let records: Vec<Record> = (1..=5).map(|i| Record::new().with("id", i)).collect();
        provider.save_data(&records).unwrap();

        assert_eq!(provider.trim_data(2, TrimEnd::Oldest).unwrap(), 2);
        let rows = provider.get_data(None).unwrap();
        assert_eq!(rows[0].get("id"), Some(&Value::Int(3)));

        assert_eq!(provider.trim_data(1, TrimEnd::Newest).unwrap(), 1);
        let rows = provider.get_data(None).unwrap();
        assert_eq!(rows.last().unwrap().get("id"), Some(&Value::Int(4)));

        assert_eq!(provider.trim_data(10, TrimEnd::Oldest).unwrap(), 2);
        assert!(provider.get_data(None).unwrap().is_empty());
    }

    #[test]
    fn declared_layout_creates_typed_columns_and_indexes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.db");
        let declared = vec![
            FieldSpec::new("ssn", FieldKind::Text).indexed(),
            FieldSpec::new("name", FieldKind::Text),
            FieldSpec::new("salary", FieldKind::Int),
        ];
        let mut provider =
            SqliteProvider::new(path.display().to_string(), "people", declared);
        provider.connect().unwrap();
        provider
            .save_data(&[Record::new()
                .with("ssn", "123-45-6789")
                .with("name", "ada")
                .with("salary", 90000)])
            .unwrap();
        provider.disconnect();

        let conn = Connection::open(&path).unwrap();
        let index: String = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'people'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index, "idx_people_ssn");
        let col_type: String = conn
            .query_row(
                "SELECT type FROM pragma_table_info('people') WHERE name = 'salary'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(col_type, "INTEGER");
    }

    #[test]
    fn reconnect_picks_up_existing_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.db").display().to_string();

        let mut provider = SqliteProvider::new(path.clone(), "events", Vec::new());
        provider.connect().unwrap();
        provider.save_data(&sample()).unwrap();
        provider.disconnect();

        let mut reopened = SqliteProvider::new(path, "events", Vec::new());
        reopened.connect().unwrap();
        assert_eq!(reopened.get_data(None).unwrap(), sample());

        // The snapshot came from the table, so new fields are still rejected.
        let err = reopened
            .save_data(&[Record::new().with("id", 3).with("other", 1)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn operations_require_connection() {
        let mut provider = SqliteProvider::new(":memory:", "events", Vec::new());
        assert_eq!(
            provider.save_data(&sample()).unwrap_err().kind(),
            ErrorKind::State
        );
        assert_eq!(
            provider.get_data(None).unwrap_err().kind(),
            ErrorKind::State
        );
        assert_eq!(provider.describe().unwrap_err().kind(), ErrorKind::State);
    }
}
