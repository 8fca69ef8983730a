//! Error types for the recmatch pipeline.
//!
//! The taxonomy mirrors the failure classes the retry policy reasons about:
//! configuration and client errors are surfaced immediately, while
//! connection, timeout, and server errors are eligible for retry.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The main error type for recmatch operations.
#[derive(Debug, Error)]
pub enum MatchPipelineError {
    /// Bad base URL, missing required configuration, or invalid input file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// DNS or TCP level failure reaching the remote.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The configured timeout or run deadline was exceeded.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A 4xx response. Retrying will not help; this indicates a caller bug.
    #[error("Client error (HTTP {status}): {message}")]
    Client {
        /// The HTTP status code.
        status: u16,
        /// Excerpt of the response body.
        message: String,
    },

    /// A 5xx response. Eligible for retry.
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        /// The HTTP status code.
        status: u16,
        /// Excerpt of the response body.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The run was cancelled before completion.
    #[error("Run cancelled: {0}")]
    Cancelled(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse or write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl MatchPipelineError {
    /// Returns the failure class of this error.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Config(_) => FailureKind::Config,
            Self::Connection(_) => FailureKind::Connection,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Client { .. } => FailureKind::Client,
            Self::Server { .. } => FailureKind::Server,
            Self::Decode(_) => FailureKind::Decode,
            Self::Cancelled(_) => FailureKind::Cancelled,
            Self::Internal(_) | Self::Io(_) | Self::Csv(_) => FailureKind::Internal,
        }
    }

    /// Returns true if re-attempting the same call has a reasonable
    /// chance of succeeding.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<reqwest::Error> for MatchPipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_builder() {
            Self::Config(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

/// Failure class tag carried on request outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Fatal configuration problem, never retried.
    Config,
    /// Transport-level connection failure, retried.
    Connection,
    /// Timeout or deadline, retried (unless the run deadline expired).
    Timeout,
    /// 4xx response, never retried.
    Client,
    /// 5xx response, retried.
    Server,
    /// Response shape violation, fatal.
    Decode,
    /// The run was cancelled.
    Cancelled,
    /// Anything else (IO, CSV, join failures).
    Internal,
}

impl FailureKind {
    /// Returns true for the error classes the retry policy re-attempts.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Connection | Self::Timeout | Self::Server)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Connection => write!(f, "connection"),
            Self::Timeout => write!(f, "timeout"),
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
            Self::Decode => write!(f, "decode"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
