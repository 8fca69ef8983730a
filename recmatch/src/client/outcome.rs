//! Raw transport responses and the tagged request outcome.

use serde::{Deserialize, Serialize};

use crate::errors::{FailureKind, MatchPipelineError};

/// One transport-level response, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// Content type from headers, empty when absent.
    pub content_type: String,
}

impl RawResponse {
    /// Whether the response is a 2xx success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Whether the response declares a JSON body.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type.contains("application/json")
    }

    /// Returns the first `max_len` characters of the body, lossily
    /// decoded. Used for error messages.
    #[must_use]
    pub fn body_excerpt(&self, max_len: usize) -> String {
        let text = String::from_utf8_lossy(&self.body);
        text.chars().take(max_len).collect()
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseBody {
    /// Decoded JSON value.
    Json(serde_json::Value),
    /// Raw bytes, when JSON decoding was not requested.
    Bytes(Vec<u8>),
}

impl ResponseBody {
    /// Returns the JSON value, decoding raw bytes on demand.
    pub fn into_value(self) -> Result<serde_json::Value, MatchPipelineError> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Bytes(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| MatchPipelineError::Decode(format!("response body is not JSON: {e}"))),
        }
    }
}

/// The tagged result of a request, after normalization and retries.
///
/// Created by the retry policy (or by the normalizer, for a single
/// attempt) and consumed once by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestOutcome {
    /// The request succeeded.
    Success {
        /// HTTP status code.
        status_code: u16,
        /// Decoded body.
        body: ResponseBody,
        /// Number of attempts performed.
        attempts: u32,
    },
    /// The request failed, after retries where applicable.
    Failure {
        /// The failure class.
        kind: FailureKind,
        /// Human-readable message (body excerpt for HTTP failures).
        message: String,
        /// HTTP status, when the failure came from a response.
        status: Option<u16>,
        /// Number of attempts performed.
        attempts: u32,
    },
}

impl RequestOutcome {
    /// Creates a single-attempt success outcome.
    #[must_use]
    pub fn success(status_code: u16, body: ResponseBody) -> Self {
        Self::Success {
            status_code,
            body,
            attempts: 1,
        }
    }

    /// Creates a single-attempt failure outcome.
    #[must_use]
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
            status: None,
            attempts: 1,
        }
    }

    /// Creates a single-attempt failure outcome carrying an HTTP status.
    #[must_use]
    pub fn http_failure(kind: FailureKind, status: u16, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
            status: Some(status),
            attempts: 1,
        }
    }

    /// Creates a failure outcome from a transport error.
    #[must_use]
    pub fn from_error(err: &MatchPipelineError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }

    /// Whether this outcome is a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure kind, if any.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Number of attempts performed.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => *attempts,
        }
    }

    /// Returns the outcome with its attempt count replaced.
    #[must_use]
    pub fn with_attempts(mut self, count: u32) -> Self {
        match &mut self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => *attempts = count,
        }
        self
    }

    /// Converts the outcome into a `Result`, rebuilding the error the
    /// failure was tagged with.
    pub fn into_result(self) -> Result<(u16, ResponseBody), MatchPipelineError> {
        match self {
            Self::Success {
                status_code, body, ..
            } => Ok((status_code, body)),
            Self::Failure {
                kind,
                message,
                status,
                ..
            } => Err(error_for(kind, message, status)),
        }
    }
}

/// Rebuilds a typed error from a failure tag.
fn error_for(kind: FailureKind, message: String, status: Option<u16>) -> MatchPipelineError {
    match kind {
        FailureKind::Config => MatchPipelineError::Config(message),
        FailureKind::Connection => MatchPipelineError::Connection(message),
        FailureKind::Timeout => MatchPipelineError::Timeout(message),
        FailureKind::Client => MatchPipelineError::Client {
            status: status.unwrap_or_default(),
            message,
        },
        FailureKind::Server => MatchPipelineError::Server {
            status: status.unwrap_or_default(),
            message,
        },
        FailureKind::Decode => MatchPipelineError::Decode(message),
        FailureKind::Cancelled => MatchPipelineError::Cancelled(message),
        FailureKind::Internal => MatchPipelineError::Internal(message),
    }
}
