//! JSON document-file storage provider.

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BackendInfo, BackendKind, Provider, TrimEnd};
use crate::record::{Filter, Record, RecordSet};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::debug;

/// JSON document file storage.
///
/// The document is a top-level array of objects, no envelope. Saving reads
/// the existing array, appends the new records, and rewrites the whole
/// document atomically: the new content is written to a temporary file in
/// the same directory and renamed over the original, so a crash mid-write
/// leaves the prior committed document unchanged. The temporary file is
/// removed on failure.
///
/// Unlike the CSV and SQLite backends, documents are schema-free: records
/// with heterogeneous field sets may share one file.
///
/// Reading a file that does not exist yet yields an empty record set.
#[derive(Debug)]
pub struct JsonProvider {
    path: PathBuf,
    connected: bool,
}

impl JsonProvider {
    /// Creates a provider for the document at `path`.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            connected: false,
        }
    }

    /// Returns the path to the underlying document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        self.path.with_file_name(format!("{name}.tmp"))
    }

    fn read_document(&self) -> ProviderResult<RecordSet> {
        let loc = self.path.display();
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| ProviderError::read(format!("unable to read '{loc}': {e}")))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let doc: JsonValue = serde_json::from_str(&raw)
            .map_err(|e| ProviderError::read(format!("unable to parse '{loc}': {e}")))?;
        let JsonValue::Array(items) = doc else {
            return Err(ProviderError::read(format!(
                "expected a top-level JSON array in '{loc}'"
            )));
        };
        items.iter().map(Record::from_json).collect()
    }

    /// Atomic rewrite: write to a temporary sibling, then rename over the
    /// document. The temporary is removed on every failure path.
    fn write_document(&self, records: &[Record]) -> ProviderResult<()> {
        let doc = JsonValue::Array(records.iter().map(Record::to_json).collect());
        let body = serde_json::to_string_pretty(&doc).map_err(|e| {
            ProviderError::write(format!("unable to serialize document: {e}"))
        })?;

        let tmp = self.temp_path();
        if let Err(e) = std::fs::write(&tmp, body) {
            let _ = std::fs::remove_file(&tmp);
            return Err(ProviderError::write(format!(
                "unable to write temporary file '{}': {e}",
                tmp.display()
            )));
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(ProviderError::write(format!(
                "unable to replace '{}': {e}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl Provider for JsonProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::Json
    }

    fn connect(&mut self) -> ProviderResult<()> {
        if self.connected {
            return Ok(());
        }
        let loc = self.path.display();
        if self.path.is_dir() {
            return Err(ProviderError::connection(format!(
                "'{loc}' is a directory, not a JSON document"
            )));
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ProviderError::connection(format!(
                        "unable to create parent directory for '{loc}': {e}"
                    ))
                })?;
            }
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            debug!("releasing json document '{}'", self.path.display());
        }
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn save_data(&mut self, records: &[Record]) -> ProviderResult<usize> {
        if !self.connected {
            return Err(ProviderError::state("json provider is not connected"));
        }
        if records.is_empty() {
            return Err(ProviderError::validation("no records to store"));
        }
        let mut doc = self.read_document()?;
        doc.extend(records.iter().cloned());
        self.write_document(&doc)?;
        Ok(records.len())
    }

    fn get_data(&mut self, filter: Option<&Filter>) -> ProviderResult<RecordSet> {
        if !self.connected {
            return Err(ProviderError::state("json provider is not connected"));
        }
        let rows = self.read_document()?;
        Ok(match filter {
            Some(f) => rows.into_iter().filter(|r| f.matches(r)).collect(),
            None => rows,
        })
    }

    fn trim_data(&mut self, count: usize, end: TrimEnd) -> ProviderResult<usize> {
        if !self.connected {
            return Err(ProviderError::state("json provider is not connected"));
        }
        let rows = self.read_document()?;
        if rows.is_empty() || count == 0 {
            return Ok(0);
        }
        let removed = count.min(rows.len());
        let remaining = match end {
            TrimEnd::Oldest => &rows[removed..],
            TrimEnd::Newest => &rows[..rows.len() - removed],
        };
        self.write_document(remaining)?;
        Ok(removed)
    }

    fn describe(&self) -> ProviderResult<BackendInfo> {
        Ok(BackendInfo {
            kind: BackendKind::Json,
            location: self.path.display().to_string(),
            records: self.read_document()?.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::record::Value;
    use tempfile::tempdir;

    fn connected(path: &Path) -> JsonProvider {
        let mut provider = JsonProvider::new(path);
        provider.connect().unwrap();
        provider
    }

    fn sample() -> Vec<Record> {
        vec![
            Record::new().with("id", 1).with("name", "a").with("active", true),
            Record::new().with("id", 2).with("name", "b").with("active", false),
        ]
    }

    #[test]
    fn typed_values_round_trip() {
        let dir = tempdir().unwrap();
        let mut provider = connected(&dir.path().join("data.json"));

        let records = vec![Record::new()
            .with("id", 1)
            .with("score", 2.5)
            .with("ok", true)
            .with("note", Value::Null)
            .with("name", "ada")];
        provider.save_data(&records).unwrap();

        assert_eq!(provider.get_data(None).unwrap(), records);
    }

    #[test]
    fn document_is_a_plain_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut provider = connected(&path);
        provider.save_data(&sample()).unwrap();

        let doc: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(doc.is_array());
        assert_eq!(doc.as_array().unwrap().len(), 2);
    }

    #[test]
    fn save_appends_to_existing_document() {
        let dir = tempdir().unwrap();
        let mut provider = connected(&dir.path().join("data.json"));
        provider.save_data(&sample()).unwrap();
        provider
            .save_data(&[Record::new().with("id", 3).with("name", "c")])
            .unwrap();

        let rows = provider.get_data(None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get("id"), Some(&Value::Int(3)));
    }

    #[test]
    fn heterogeneous_shapes_allowed() {
        let dir = tempdir().unwrap();
        let mut provider = connected(&dir.path().join("data.json"));
        let records = vec![
            Record::new().with("id", 1).with("name", "a"),
            Record::new().with("id", 2).with("email", "b@example.com"),
        ];
        assert_eq!(provider.save_data(&records).unwrap(), 2);
        assert_eq!(provider.get_data(None).unwrap(), records);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let mut provider = connected(&dir.path().join("absent.json"));
        assert!(provider.get_data(None).unwrap().is_empty());
        assert_eq!(provider.describe().unwrap().records, 0);
    }

    #[test]
    fn empty_record_set_rejected() {
        let dir = tempdir().unwrap();
        let mut provider = connected(&dir.path().join("data.json"));
        let err = provider.save_data(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn failed_rewrite_leaves_document_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut provider = connected(&path);
        provider.save_data(&sample()).unwrap();
        let committed = std::fs::read_to_string(&path).unwrap();

        // Occupy the temporary path with a directory so the rewrite cannot
        // even stage its new content.
        std::fs::create_dir(dir.path().join("data.json.tmp")).unwrap();
        let err = provider
            .save_data(&[Record::new().with("id", 9)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Write);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), committed);
        std::fs::remove_dir(dir.path().join("data.json.tmp")).unwrap();
        assert_eq!(provider.get_data(None).unwrap(), sample());
    }

    #[test]
    fn stale_temporary_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        let tmp = dir.path().join("data.json.tmp");
        let mut provider = connected(&path);
        provider.save_data(&sample()).unwrap();

        // Simulates a writer that died after staging but before the rename.
        std::fs::write(&tmp, "garbage").unwrap();
        assert_eq!(provider.get_data(None).unwrap(), sample());

        provider
            .save_data(&[Record::new().with("id", 3).with("name", "c")])
            .unwrap();
        assert!(!tmp.exists());
        assert_eq!(provider.get_data(None).unwrap().len(), 3);
    }

    #[test]
    fn filter_selects_matching_rows() {
        let dir = tempdir().unwrap();
        let mut provider = connected(&dir.path().join("data.json"));
        provider.save_data(&sample()).unwrap();

        let rows = provider
            .get_data(Some(&Filter::equals("active", true)))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn trim_oldest_and_newest() {
        let dir = tempdir().unwrap();
        let mut provider = connected(&dir.path().join("data.json"));
        let records: Vec<Record> = (1..=5).map(|i| Record::new().with("id", i)).collect();
        provider.save_data(&records).unwrap();

        assert_eq!(provider.trim_data(2, TrimEnd::Newest).unwrap(), 2);
        let rows = provider.get_data(None).unwrap();
        assert_eq!(rows.last().unwrap().get("id"), Some(&Value::Int(3)));

        assert_eq!(provider.trim_data(10, TrimEnd::Oldest).unwrap(), 3);
        assert!(provider.get_data(None).unwrap().is_empty());
    }

    #[test]
    fn nested_values_rejected_on_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"[{"a": {"b": 1}}]"#).unwrap();

        let mut provider = connected(&path);
        let err = provider.get_data(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn non_array_document_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"rows": []}"#).unwrap();

        let mut provider = connected(&path);
        let err = provider.get_data(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    #[test]
    fn connect_rejects_directory_location() {
        let dir = tempdir().unwrap();
        let mut provider = JsonProvider::new(dir.path());
        let err = provider.connect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
