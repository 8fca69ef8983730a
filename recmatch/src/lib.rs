//! # Recmatch
//!
//! A resilient HTTP fetching and fuzzy record matching pipeline.
//!
//! Recmatch fetches two labeled record sets - from HTTP JSON endpoints
//! or local CSV files - scores every left/right label pair with a
//! pluggable similarity function, selects the best match per left record
//! above a threshold, and emits a CSV report. It provides:
//!
//! - **Resilient fetching**: one pooled HTTP client per source, wrapped
//!   in a retry policy with exponential backoff and per-error-class
//!   decisions (5xx and transport failures retry, 4xx fail fast)
//! - **Tagged outcomes**: every request resolves to an explicit
//!   success/failure value instead of an exception bubbling up
//! - **Deterministic matching**: all-pairs scoring sharded across
//!   threads with order-stable merging and first-seen tie-breaking
//! - **Deadline handling**: an overall run deadline that abandons
//!   in-flight attempts and overrides the remaining retry budget
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use recmatch::prelude::*;
//!
//! let config = PipelineConfig::new()
//!     .with_matching(MatchConfig::new().with_threshold(60.0));
//! let left = source_for("https://api.example.com/funds", &config)?;
//! let right = source_for("holdings.csv", &config)?;
//!
//! let report = Orchestrator::new(config).run(left.as_ref(), right.as_ref()).await?;
//! report.write_csv_file("matched.csv")?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod client;
pub mod config;
pub mod errors;
pub mod matching;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod sources;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::RunToken;
    pub use crate::client::{
        execute_with_retry, normalize, BackoffStrategy, ConnectionManager, HttpMethod,
        JitterStrategy, RawResponse, RequestOutcome, ResponseBody,
    };
    pub use crate::config::{ClientConfig, MatchConfig, PipelineConfig, RetryConfig};
    pub use crate::errors::{FailureKind, MatchPipelineError};
    pub use crate::matching::{best_matches, match_candidates, SimilarityKind};
    pub use crate::pipeline::{Orchestrator, PipelineState};
    pub use crate::record::{MatchCandidate, MatchResult, Record};
    pub use crate::report::MatchReport;
    pub use crate::sources::{
        source_for, CsvSource, HttpSource, RecordSource, StaticSource,
    };
}
