//! Test doubles for pipeline testing.
//!
//! Hand-written fakes used by the integration tests and available to
//! downstream callers testing their own pipelines. `StaticSource` in
//! [`crate::sources`] covers the happy path; the doubles here cover
//! failures.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::cancellation::RunToken;
use crate::errors::{FailureKind, MatchPipelineError};
use crate::record::Record;
use crate::sources::RecordSource;

/// A source that always fails with a configurable error class.
///
/// Counts its calls so assertions can check that a non-retryable
/// failure was only hit once.
#[derive(Debug)]
pub struct FailingSource {
    kind: FailureKind,
    message: String,
    calls: Mutex<usize>,
}

impl FailingSource {
    /// Creates a failing source.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            calls: Mutex::new(0),
        }
    }

    /// Number of times `fetch_records` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }

    fn build_error(&self) -> MatchPipelineError {
        let message = self.message.clone();
        match self.kind {
            FailureKind::Config => MatchPipelineError::Config(message),
            FailureKind::Connection => MatchPipelineError::Connection(message),
            FailureKind::Timeout => MatchPipelineError::Timeout(message),
            FailureKind::Client => MatchPipelineError::Client {
                status: 404,
                message,
            },
            FailureKind::Server => MatchPipelineError::Server {
                status: 503,
                message,
            },
            FailureKind::Decode => MatchPipelineError::Decode(message),
            FailureKind::Cancelled => MatchPipelineError::Cancelled(message),
            FailureKind::Internal => MatchPipelineError::Internal(message),
        }
    }
}

#[async_trait]
impl RecordSource for FailingSource {
    async fn fetch_records(&self, _token: &RunToken) -> Result<Vec<Record>, MatchPipelineError> {
        *self.calls.lock() += 1;
        Err(self.build_error())
    }

    fn describe(&self) -> String {
        format!("failing-source({})", self.kind)
    }
}
