//! Core record and match data model.
//!
//! Records are immutable once fetched; the match engine borrows them
//! read-only and produces candidates and results that reference records
//! by id only.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// One labeled entity to be matched (e.g. a fund name with an id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier within its source collection.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// The label the similarity function scores against. Source payloads
    /// carry this under either `label` or `name`.
    #[serde(alias = "name")]
    pub label: String,
}

impl Record {
    /// Creates a new record.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Accepts both string and integer ids, as the source endpoints disagree.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "record id must be a string or number, got {other}"
        ))),
    }
}

/// A scored (left, right) pair produced by the match engine.
///
/// The score is deterministic given the same similarity function and
/// inputs, and always falls in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Id of the left record.
    pub left_id: String,
    /// Id of the right record.
    pub right_id: String,
    /// Similarity score in [0, 100].
    pub score: f64,
}

impl MatchCandidate {
    /// Creates a new candidate.
    #[must_use]
    pub fn new(left_id: impl Into<String>, right_id: impl Into<String>, score: f64) -> Self {
        Self {
            left_id: left_id.into(),
            right_id: right_id.into(),
            score,
        }
    }
}

/// The selected best match for one left record.
///
/// At most one exists per left id; left records with no candidate above
/// the threshold produce no entry at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Id of the left record.
    pub left_id: String,
    /// Label of the left record.
    pub left_label: String,
    /// Id of the matched right record.
    pub right_id: String,
    /// Label of the matched right record.
    pub right_label: String,
    /// Similarity score in [0, 100].
    pub score: f64,
}
