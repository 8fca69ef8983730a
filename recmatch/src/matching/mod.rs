//! Fuzzy record matching.
//!
//! This module provides:
//! - Pluggable similarity functions on a [0, 100] scale
//! - All-pairs candidate generation with sharded parallelism
//! - Best-match selection with deterministic tie-breaking

pub mod engine;
pub mod similarity;

pub use engine::{best_matches, match_candidates};
pub use similarity::{token_sort_ratio, SimilarityKind};
