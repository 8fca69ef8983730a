//! The final matched table and its CSV serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

use crate::errors::MatchPipelineError;
use crate::record::MatchResult;

/// Column order of the CSV report.
const HEADER: [&str; 5] = ["left_id", "left_label", "right_id", "right_label", "score"];

/// The result of one pipeline run: the matched table plus diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    /// Identifier of the run that produced this report.
    pub run_id: String,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// One row per matched left record, in left-source input order.
    pub results: Vec<MatchResult>,
    /// Ids of left records with no match above the threshold.
    pub unmatched_left: Vec<String>,
    /// Size of the left record set.
    pub total_left: usize,
    /// Size of the right record set.
    pub total_right: usize,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

impl MatchReport {
    /// Number of left records with no match above the threshold.
    #[must_use]
    pub fn unmatched_count(&self) -> usize {
        self.unmatched_left.len()
    }

    /// Whether every left record found a match.
    #[must_use]
    pub fn is_fully_matched(&self) -> bool {
        self.unmatched_left.is_empty()
    }

    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "matched {} of {} left records against {} right records ({} unmatched)",
            self.results.len(),
            self.total_left,
            self.total_right,
            self.unmatched_count()
        )
    }

    /// Writes the matched table as CSV.
    ///
    /// Scores are written with `f64`'s shortest round-trip formatting, so
    /// re-parsing the table yields the exact same values.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), MatchPipelineError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(HEADER)?;
        for result in &self.results {
            csv_writer.write_record([
                result.left_id.as_str(),
                result.left_label.as_str(),
                result.right_id.as_str(),
                result.right_label.as_str(),
                result.score.to_string().as_str(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the matched table as CSV to a file path.
    pub fn write_csv_file(&self, path: impl AsRef<Path>) -> Result<(), MatchPipelineError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }

    /// Reads a matched table back from CSV.
    pub fn read_csv<R: Read>(reader: R) -> Result<Vec<MatchResult>, MatchPipelineError> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.iter().ne(HEADER) {
            return Err(MatchPipelineError::Decode(format!(
                "unexpected report header: {headers:?}"
            )));
        }

        let mut results = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            let field = |col: usize| record.get(col).unwrap_or_default().to_string();
            let score: f64 = record.get(4).unwrap_or_default().parse().map_err(|e| {
                MatchPipelineError::Decode(format!("row {}: bad score: {e}", row + 2))
            })?;
            results.push(MatchResult {
                left_id: field(0),
                left_label: field(1),
                right_id: field(2),
                right_label: field(3),
                score,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_report() -> MatchReport {
        MatchReport {
            run_id: "run-1".to_string(),
            generated_at: Utc::now(),
            results: vec![
                MatchResult {
                    left_id: "1".to_string(),
                    left_label: "Alpha Fund".to_string(),
                    right_id: "10".to_string(),
                    right_label: "Alpha Fund".to_string(),
                    score: 100.0,
                },
                MatchResult {
                    left_id: "2".to_string(),
                    left_label: "Beta Fund, LP".to_string(),
                    right_id: "11".to_string(),
                    right_label: "Beta Fund".to_string(),
                    score: 76.92307692307693,
                },
            ],
            unmatched_left: vec!["3".to_string()],
            total_left: 3,
            total_right: 2,
            duration_ms: 12,
        }
    }

    #[test]
    fn test_csv_roundtrip_preserves_triples() {
        let report = sample_report();

        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();
        let parsed = MatchReport::read_csv(buffer.as_slice()).unwrap();

        assert_eq!(parsed, report.results);
    }

    #[test]
    fn test_csv_quotes_embedded_commas() {
        let report = sample_report();
        let mut buffer = Vec::new();
        report.write_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("\"Beta Fund, LP\""));
    }

    #[test]
    fn test_read_csv_rejects_wrong_header() {
        let csv = "a,b,c\n1,2,3\n";
        let err = MatchReport::read_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, MatchPipelineError::Decode(_)));
    }

    #[test]
    fn test_read_csv_rejects_bad_score() {
        let csv = "left_id,left_label,right_id,right_label,score\n1,a,2,b,not-a-number\n";
        let err = MatchReport::read_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, MatchPipelineError::Decode(_)));
    }

    #[test]
    fn test_summary_counts() {
        let report = sample_report();
        assert_eq!(
            report.summary(),
            "matched 2 of 3 left records against 2 right records (1 unmatched)"
        );
        assert!(!report.is_fully_matched());
        assert_eq!(report.unmatched_count(), 1);
    }

    #[test]
    fn test_write_csv_file_roundtrip() {
        let report = sample_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        report.write_csv_file(&path).unwrap();
        let file = std::fs::File::open(&path).unwrap();
        let parsed = MatchReport::read_csv(file).unwrap();
        assert_eq!(parsed, report.results);
    }
}
