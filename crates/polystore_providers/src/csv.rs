//! CSV flat-file storage provider.

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BackendInfo, BackendKind, Provider, TrimEnd};
use crate::record::{Filter, Record, RecordSet, Value};
use ::csv::{Reader, Writer};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only CSV file storage.
///
/// The first line of the file is a header row; data rows follow in column
/// order. The header is the schema snapshot for the handle's lifetime: it is
/// read from the file at connect (or taken from the declared field names),
/// otherwise derived from the first record saved. Every saved record must
/// match it exactly, names and order both.
///
/// Values round-trip as text: `get_data` returns every cell as
/// [`Value::Text`], and `Null` is written as an empty cell. Callers wanting
/// typed values run the record set through a processor.
///
/// Appends are not atomic. A crash mid-append can leave a truncated final
/// row; this is an accepted limitation of the flat-file format.
///
/// Reading a file that does not exist yet yields an empty record set.
pub struct CsvProvider {
    path: PathBuf,
    declared: Option<Vec<String>>,
    header: Option<Vec<String>>,
    writer: Option<Writer<File>>,
}

impl CsvProvider {
    /// Creates a provider for the file at `path`.
    ///
    /// `declared` pins the header to the given field names; when `None` the
    /// header is inferred as described above.
    #[must_use]
    pub fn new(path: &Path, declared: Option<Vec<String>>) -> Self {
        Self {
            path: path.to_path_buf(),
            declared,
            header: None,
            writer: None,
        }
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file: header row and data rows.
    fn read_all(&self) -> ProviderResult<(Vec<String>, RecordSet)> {
        let loc = self.path.display();
        if !self.path.exists() {
            return Ok((Vec::new(), Vec::new()));
        }
        let len = std::fs::metadata(&self.path)
            .map_err(|e| ProviderError::read(format!("unable to stat '{loc}': {e}")))?
            .len();
        if len == 0 {
            return Ok((Vec::new(), Vec::new()));
        }

        let mut reader = Reader::from_path(&self.path)
            .map_err(|e| ProviderError::read(format!("unable to open '{loc}': {e}")))?;
        let header: Vec<String> = reader
            .headers()
            .map_err(|e| ProviderError::read(format!("unable to read header of '{loc}': {e}")))?
            .iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for row in reader.records() {
            let row =
                row.map_err(|e| ProviderError::read(format!("unable to read '{loc}': {e}")))?;
            let mut record = Record::new();
            for (name, cell) in header.iter().zip(row.iter()) {
                record.set(name.clone(), Value::Text(cell.to_string()));
            }
            rows.push(record);
        }
        Ok((header, rows))
    }

    /// Rewrites the file with the given header and rows.
    fn rewrite(&self, header: &[String], rows: &[Record]) -> ProviderResult<()> {
        let loc = self.path.display();
        let mut writer = Writer::from_path(&self.path)
            .map_err(|e| ProviderError::write(format!("unable to rewrite '{loc}': {e}")))?;
        writer
            .write_record(header)
            .map_err(|e| ProviderError::write(format!("unable to write header to '{loc}': {e}")))?;
        for row in rows {
            writer
                .write_record(row.iter().map(|(_, v)| v.to_string()))
                .map_err(|e| ProviderError::write(format!("unable to write to '{loc}': {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| ProviderError::write(format!("unable to flush '{loc}': {e}")))?;
        Ok(())
    }
}

impl fmt::Debug for CsvProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvProvider")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("connected", &self.writer.is_some())
            .finish_non_exhaustive()
    }
}

impl Provider for CsvProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::Csv
    }

    fn connect(&mut self) -> ProviderResult<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        let loc = self.path.display().to_string();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ProviderError::connection(format!(
                        "unable to create parent directory for '{loc}': {e}"
                    ))
                })?;
            }
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| ProviderError::connection(format!("unable to open '{loc}': {e}")))?;
        let len = file
            .metadata()
            .map_err(|e| ProviderError::connection(format!("unable to stat '{loc}': {e}")))?
            .len();

        // Schema snapshot for this handle: an existing file carries its
        // header row; an empty one takes the declared layout, if any.
        if len > 0 {
            let mut reader = Reader::from_path(&self.path).map_err(|e| {
                ProviderError::connection(format!("unable to read header of '{loc}': {e}"))
            })?;
            let header = reader.headers().map_err(|e| {
                ProviderError::connection(format!("unable to read header of '{loc}': {e}"))
            })?;
            self.header = Some(header.iter().map(String::from).collect());
        } else {
            self.header = self.declared.clone();
        }

        self.writer = Some(Writer::from_writer(file));
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!("failed to flush csv file '{}': {e}", self.path.display());
            }
        }
        self.header = None;
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    fn save_data(&mut self, records: &[Record]) -> ProviderResult<usize> {
        if !self.is_connected() {
            return Err(ProviderError::state("csv provider is not connected"));
        }
        if records.is_empty() {
            return Err(ProviderError::validation("no records to store"));
        }

        if self.header.is_none() {
            self.header = Some(records[0].field_names().map(String::from).collect());
        }
        let header = self.header.clone().unwrap_or_default();

        // Validate the whole batch up front so a shape mismatch never leaves
        // a partially written call behind.
        for (i, record) in records.iter().enumerate() {
            if !record.matches_fields(&header) {
                return Err(ProviderError::validation(format!(
                    "record {i} fields [{}] do not match header [{}]",
                    record.field_names().collect::<Vec<_>>().join(", "),
                    header.join(", ")
                )));
            }
        }

        let loc = self.path.display().to_string();
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);
        let Some(writer) = self.writer.as_mut() else {
            return Err(ProviderError::state("csv provider is not connected"));
        };

        if needs_header {
            writer.write_record(&header).map_err(|e| {
                ProviderError::write(format!("unable to write header to '{loc}': {e}"))
            })?;
        }
        for record in records {
            writer
                .write_record(record.iter().map(|(_, v)| v.to_string()))
                .map_err(|e| ProviderError::write(format!("unable to write to '{loc}': {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| ProviderError::write(format!("unable to flush '{loc}': {e}")))?;
        Ok(records.len())
    }

    fn get_data(&mut self, filter: Option<&Filter>) -> ProviderResult<RecordSet> {
        if !self.is_connected() {
            return Err(ProviderError::state("csv provider is not connected"));
        }
        let (_, rows) = self.read_all()?;
        Ok(match filter {
            Some(f) => rows.into_iter().filter(|r| f.matches(r)).collect(),
            None => rows,
        })
    }

    fn trim_data(&mut self, count: usize, end: TrimEnd) -> ProviderResult<usize> {
        if !self.is_connected() {
            return Err(ProviderError::state("csv provider is not connected"));
        }
        let (header, rows) = self.read_all()?;
        if rows.is_empty() || count == 0 {
            return Ok(0);
        }
        let removed = count.min(rows.len());
        let remaining = match end {
            TrimEnd::Oldest => &rows[removed..],
            TrimEnd::Newest => &rows[..rows.len() - removed],
        };
        self.rewrite(&header, remaining)?;
        Ok(removed)
    }

    fn describe(&self) -> ProviderResult<BackendInfo> {
        let (_, rows) = self.read_all()?;
        Ok(BackendInfo {
            kind: BackendKind::Csv,
            location: self.path.display().to_string(),
            records: rows.len(),
        })
    }
}
