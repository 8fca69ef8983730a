//! End-to-end pipeline orchestration.
//!
//! Drives `FetchingLeft -> FetchingRight -> Matching -> Done`, moving to
//! `Failed` on the first unrecoverable error. Fetch failures abort the
//! run with the error kind unchanged; there is no partial-result
//! recovery.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use crate::cancellation::RunToken;
use crate::config::PipelineConfig;
use crate::errors::MatchPipelineError;
use crate::matching::{best_matches, match_candidates};
use crate::pipeline::state::PipelineState;
use crate::record::{MatchResult, Record};
use crate::report::MatchReport;
use crate::sources::{ensure_unique_ids, RecordSource};

/// Drives one fetch-fetch-match run.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: PipelineConfig,
}

impl Orchestrator {
    /// Creates an orchestrator for the given configuration.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The configuration this orchestrator runs with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline end to end.
    ///
    /// Fetches the left source, then the right, each through the retry
    /// policy, then scores all pairs and selects best matches. Any fetch
    /// or validation failure aborts the run and propagates unchanged.
    pub async fn run(
        &self,
        left: &dyn RecordSource,
        right: &dyn RecordSource,
    ) -> Result<MatchReport, MatchPipelineError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let token = match self.config.deadline_ms {
            Some(ms) => RunToken::with_deadline(Duration::from_millis(ms)),
            None => RunToken::new(),
        };

        let mut state = PipelineState::FetchingLeft;
        tracing::info!(%run_id, state = %state, source = %left.describe(), "Fetching left records");
        let left_records = self
            .fetch_side(left, &token, run_id, state, "left")
            .await?;

        state = PipelineState::FetchingRight;
        tracing::info!(%run_id, state = %state, source = %right.describe(), "Fetching right records");
        let right_records = self
            .fetch_side(right, &token, run_id, state, "right")
            .await?;

        state = PipelineState::Matching;
        if token.deadline_expired() {
            return Err(Self::fail(
                run_id,
                state,
                MatchPipelineError::Timeout("run deadline exceeded before matching".to_string()),
            ));
        }
        tracing::info!(
            %run_id,
            state = %state,
            left = left_records.len(),
            right = right_records.len(),
            threshold = self.config.matching.similarity_threshold,
            similarity = %self.config.matching.similarity,
            "Scoring candidate pairs"
        );

        let matching = self.config.matching.clone();
        let (left_records, right_records, candidates) =
            tokio::task::spawn_blocking(move || {
                let similarity = matching.similarity;
                let candidates = match_candidates(
                    &left_records,
                    &right_records,
                    &|a: &str, b: &str| similarity.score(a, b),
                    matching.similarity_threshold,
                    matching.workers,
                );
                (left_records, right_records, candidates)
            })
            .await
            .map_err(|e| {
                Self::fail(
                    run_id,
                    PipelineState::Matching,
                    MatchPipelineError::Internal(format!("match worker panicked: {e}")),
                )
            })?;

        let best = best_matches(&candidates);

        let right_labels: HashMap<&str, &str> = right_records
            .iter()
            .map(|r| (r.id.as_str(), r.label.as_str()))
            .collect();

        let mut results = Vec::new();
        let mut unmatched_left = Vec::new();
        for record in &left_records {
            match best.get(&record.id) {
                Some(candidate) => results.push(MatchResult {
                    left_id: record.id.clone(),
                    left_label: record.label.clone(),
                    right_id: candidate.right_id.clone(),
                    right_label: right_labels
                        .get(candidate.right_id.as_str())
                        .copied()
                        .unwrap_or_default()
                        .to_string(),
                    score: candidate.score,
                }),
                None => unmatched_left.push(record.id.clone()),
            }
        }

        state = PipelineState::Done;
        let report = MatchReport {
            run_id: run_id.to_string(),
            generated_at: Utc::now(),
            results,
            unmatched_left,
            total_left: left_records.len(),
            total_right: right_records.len(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(%run_id, state = %state, summary = %report.summary(), "Pipeline finished");
        Ok(report)
    }

    async fn fetch_side(
        &self,
        source: &dyn RecordSource,
        token: &RunToken,
        run_id: Uuid,
        state: PipelineState,
        side: &str,
    ) -> Result<Vec<Record>, MatchPipelineError> {
        let records = source
            .fetch_records(token)
            .await
            .map_err(|err| Self::fail(run_id, state, err))?;
        ensure_unique_ids(&records, side).map_err(|err| Self::fail(run_id, state, err))?;
        tracing::debug!(%run_id, state = %state, count = records.len(), "Fetched records");
        Ok(records)
    }

    /// Logs the transition to `Failed` and hands the error back unchanged.
    fn fail(run_id: Uuid, state: PipelineState, err: MatchPipelineError) -> MatchPipelineError {
        tracing::error!(
            %run_id,
            state = %state,
            to = %PipelineState::Failed,
            error = %err,
            "Pipeline failed"
        );
        err
    }
}
