//! Resilient HTTP client.
//!
//! This module provides:
//! - A connection manager owning one configured, pooled HTTP client
//! - Response normalization into tagged outcomes
//! - A retry policy with exponential backoff and deadline awareness

pub mod connection;
pub mod normalize;
pub mod outcome;
pub mod retry;

pub use connection::{ConnectionManager, HttpMethod};
pub use normalize::normalize;
pub use outcome::{RawResponse, RequestOutcome, ResponseBody};
pub use retry::{apply_jitter, decide, execute_with_retry, BackoffStrategy, JitterStrategy, RetryDecision};
