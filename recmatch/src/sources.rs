//! Record sources: where the two labeled tables come from.
//!
//! A source is either an HTTP JSON endpoint (fetched through the
//! connection manager and retry policy) or a local CSV file with a
//! `Name`/`label` column. Records are validated at the boundary: shape
//! violations in a remote payload are decode errors, and a blank label
//! in a local file is a configuration error rather than a silently
//! dropped row.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::cancellation::RunToken;
use crate::client::{execute_with_retry, normalize, ConnectionManager, HttpMethod, RequestOutcome};
use crate::config::{ClientConfig, PipelineConfig, RetryConfig};
use crate::errors::{FailureKind, MatchPipelineError};
use crate::record::Record;

/// A source of labeled records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches all records from the source.
    async fn fetch_records(&self, token: &RunToken) -> Result<Vec<Record>, MatchPipelineError>;

    /// Human-readable description of the source, used in logs and errors.
    fn describe(&self) -> String;
}

/// Builds a source from a CLI-style spec: URLs become HTTP sources,
/// everything else is treated as a CSV path.
pub fn source_for(
    spec: &str,
    config: &PipelineConfig,
) -> Result<Box<dyn RecordSource>, MatchPipelineError> {
    if spec.starts_with("http://") || spec.starts_with("https://") {
        Ok(Box::new(HttpSource::from_url(spec, config)?))
    } else {
        Ok(Box::new(CsvSource::new(spec)?))
    }
}

/// An HTTP JSON endpoint serving an array of `{id, name|label}` objects.
pub struct HttpSource {
    manager: ConnectionManager,
    path: String,
    retry: RetryConfig,
    expect_json: bool,
}

impl HttpSource {
    /// Creates a source that fetches the manager's base URL.
    #[must_use]
    pub fn new(manager: ConnectionManager, retry: RetryConfig) -> Self {
        Self {
            manager,
            path: String::new(),
            retry,
            expect_json: true,
        }
    }

    /// Creates a source for a full URL, inheriting everything but the
    /// base URL from the pipeline config.
    pub fn from_url(url: &str, config: &PipelineConfig) -> Result<Self, MatchPipelineError> {
        let client = ClientConfig {
            base_url: url.to_string(),
            ..config.client.clone()
        };
        Ok(Self {
            manager: ConnectionManager::new(client)?,
            path: String::new(),
            retry: config.retry.clone(),
            expect_json: config.expect_json,
        })
    }

    /// Sets a path fetched relative to the base URL.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

#[async_trait]
impl RecordSource for HttpSource {
    async fn fetch_records(&self, token: &RunToken) -> Result<Vec<Record>, MatchPipelineError> {
        let key = self.describe();
        let outcome = execute_with_retry(
            &self.retry,
            &key,
            token,
            FailureKind::is_retryable,
            || {
                let manager = &self.manager;
                let path = self.path.as_str();
                let expect_json = self.expect_json;
                async move {
                    match manager.send(HttpMethod::Get, path, None, None).await {
                        Ok(raw) => normalize(&raw, expect_json),
                        Err(err) => RequestOutcome::from_error(&err),
                    }
                }
            },
        )
        .await;

        tracing::debug!(
            source = %key,
            attempts = outcome.attempts(),
            success = outcome.is_success(),
            "Fetch finished"
        );

        let (_, body) = outcome.into_result()?;
        parse_records(&body.into_value()?)
    }

    fn describe(&self) -> String {
        if self.path.is_empty() {
            self.manager.base_url().to_string()
        } else {
            format!("{}{}", self.manager.base_url(), self.path)
        }
    }
}

/// Extracts records from a decoded JSON payload.
///
/// Accepts a top-level array, or an object carrying the array under a
/// `records`, `data`, or `results` key. Anything else, or a record
/// object without a usable id/label, is a decode error.
pub fn parse_records(value: &serde_json::Value) -> Result<Vec<Record>, MatchPipelineError> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => map
            .get("records")
            .or_else(|| map.get("data"))
            .or_else(|| map.get("results"))
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| {
                MatchPipelineError::Decode(
                    "expected a JSON array of records, or an object with a \
                     records/data/results array"
                        .to_string(),
                )
            })?,
        other => {
            return Err(MatchPipelineError::Decode(format!(
                "expected a JSON array of records, got {other}"
            )))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let record: Record = serde_json::from_value(item.clone())
                .map_err(|e| MatchPipelineError::Decode(format!("record {index}: {e}")))?;
            if record.label.trim().is_empty() {
                return Err(MatchPipelineError::Decode(format!(
                    "record {index} (id '{}') has a blank label",
                    record.id
                )));
            }
            Ok(record)
        })
        .collect()
}

/// A local CSV file with a `Name`/`name`/`label` column and an optional
/// `id` column (1-based row numbers are used when absent).
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    /// Creates a CSV source. Rejects `.xlsx` paths up front; only CSV is
    /// supported for local tables.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, MatchPipelineError> {
        let path = path.into();
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
        {
            return Err(MatchPipelineError::Config(format!(
                "XLSX input is not supported; convert {} to CSV first",
                path.display()
            )));
        }
        Ok(Self { path })
    }
}

fn read_csv_records(path: &Path) -> Result<Vec<Record>, MatchPipelineError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        MatchPipelineError::Config(format!("cannot read {}: {e}", path.display()))
    })?;

    let headers = reader.headers()?.clone();
    let label_col = headers
        .iter()
        .position(|h| {
            let h = h.trim();
            h.eq_ignore_ascii_case("name") || h.eq_ignore_ascii_case("label")
        })
        .ok_or_else(|| {
            MatchPipelineError::Config(format!(
                "{}: no Name/label column in header",
                path.display()
            ))
        })?;
    let id_col = headers.iter().position(|h| h.trim().eq_ignore_ascii_case("id"));

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let row_record = result?;
        let label = row_record.get(label_col).unwrap_or_default().trim();
        if label.is_empty() {
            // Deliberately an error, not a silent drop.
            return Err(MatchPipelineError::Config(format!(
                "{}: row {} has a blank label",
                path.display(),
                row + 2
            )));
        }
        let id = id_col
            .and_then(|col| row_record.get(col))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| (row + 1).to_string(), String::from);
        records.push(Record::new(id, label));
    }

    Ok(records)
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn fetch_records(&self, token: &RunToken) -> Result<Vec<Record>, MatchPipelineError> {
        if token.is_cancelled() {
            return Err(MatchPipelineError::Cancelled(
                token.reason().unwrap_or_else(|| "cancelled".to_string()),
            ));
        }
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_csv_records(&path))
            .await
            .map_err(|e| MatchPipelineError::Internal(format!("CSV reader panicked: {e}")))?
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// An in-memory source, for tests and embedding callers.
pub struct StaticSource {
    name: String,
    records: Vec<Record>,
}

impl StaticSource {
    /// Creates a static source.
    #[must_use]
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

#[async_trait]
impl RecordSource for StaticSource {
    async fn fetch_records(&self, token: &RunToken) -> Result<Vec<Record>, MatchPipelineError> {
        if token.is_cancelled() {
            return Err(MatchPipelineError::Cancelled(
                token.reason().unwrap_or_else(|| "cancelled".to_string()),
            ));
        }
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

/// Fails fast when two records in one collection share an id.
pub fn ensure_unique_ids(records: &[Record], side: &str) -> Result<(), MatchPipelineError> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(MatchPipelineError::Config(format!(
                "duplicate record id '{}' in {side} source",
                record.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_records_top_level_array() {
        let value = serde_json::json!([
            {"id": 1, "name": "Alpha Fund"},
            {"id": "f_2", "label": "Beta Fund"},
        ]);
        let records = parse_records(&value).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::new("1", "Alpha Fund"));
        assert_eq!(records[1], Record::new("f_2", "Beta Fund"));
    }

    #[test]
    fn test_parse_records_nested_under_data() {
        let value = serde_json::json!({"data": [{"id": 1, "name": "Alpha"}]});
        let records = parse_records(&value).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_records_rejects_scalar() {
        let err = parse_records(&serde_json::json!(42)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Decode);
    }

    #[test]
    fn test_parse_records_rejects_missing_label() {
        let err = parse_records(&serde_json::json!([{"id": 1}])).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Decode);
    }

    #[test]
    fn test_parse_records_rejects_blank_label() {
        let err = parse_records(&serde_json::json!([{"id": 1, "name": "   "}])).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Decode);
    }

    #[test]
    fn test_csv_source_rejects_xlsx() {
        let err = CsvSource::new("funds.xlsx").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Config);
    }

    #[tokio::test]
    async fn test_csv_source_reads_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,Name").unwrap();
        writeln!(file, "f_1,Alpha Fund").unwrap();
        writeln!(file, "f_2,Beta Fund").unwrap();
        file.flush().unwrap();

        let source = CsvSource::new(file.path()).unwrap();
        let records = source.fetch_records(&RunToken::new()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::new("f_1", "Alpha Fund"));
    }

    #[tokio::test]
    async fn test_csv_source_row_number_ids_without_id_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Name").unwrap();
        writeln!(file, "Alpha Fund").unwrap();
        writeln!(file, "Beta Fund").unwrap();
        file.flush().unwrap();

        let source = CsvSource::new(file.path()).unwrap();
        let records = source.fetch_records(&RunToken::new()).await.unwrap();
        assert_eq!(records[0].id, "1");
        assert_eq!(records[1].id, "2");
    }

    #[tokio::test]
    async fn test_csv_source_blank_label_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,Name").unwrap();
        writeln!(file, "f_1,Alpha Fund").unwrap();
        writeln!(file, "f_2,").unwrap();
        file.flush().unwrap();

        let source = CsvSource::new(file.path()).unwrap();
        let err = source.fetch_records(&RunToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Config);
        assert!(err.to_string().contains("row 3"));
    }

    #[tokio::test]
    async fn test_csv_source_missing_label_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,amount").unwrap();
        writeln!(file, "f_1,100").unwrap();
        file.flush().unwrap();

        let source = CsvSource::new(file.path()).unwrap();
        let err = source.fetch_records(&RunToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Config);
    }

    #[tokio::test]
    async fn test_static_source_respects_cancellation() {
        let source = StaticSource::new("static", vec![Record::new("1", "x")]);
        let token = RunToken::new();
        token.cancel("stop");

        let err = source.fetch_records(&token).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Cancelled);
    }

    #[test]
    fn test_source_for_dispatches_on_scheme() {
        let config = PipelineConfig::default();
        let http = source_for("https://api.example.com/funds", &config).unwrap();
        assert!(http.describe().starts_with("https://"));

        let csv = source_for("funds.csv", &config).unwrap();
        assert_eq!(csv.describe(), "funds.csv");
    }

    #[test]
    fn test_ensure_unique_ids() {
        let records = vec![Record::new("1", "a"), Record::new("2", "b")];
        assert!(ensure_unique_ids(&records, "left").is_ok());

        let records = vec![Record::new("1", "a"), Record::new("1", "b")];
        let err = ensure_unique_ids(&records, "left").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Config);
        assert!(err.to_string().contains("left"));
    }
}
