//! Fuzzy match engine: all-pairs scoring and best-match selection.
//!
//! The cartesian scan is O(|left| * |right|), which is fine for the
//! corpus-scale inputs this targets (hundreds to low thousands of
//! records). Larger inputs would need a blocking/indexing pass in front
//! of the scan; that would be an addition, not a semantic change.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use crate::record::{MatchCandidate, Record};

/// Computes all candidate pairs scoring at or above the threshold.
///
/// The outer loop is sharded across `workers` OS threads (zero means one
/// per available core); each shard collects locally and the shards merge
/// in order, so the output is always sorted by (left index, right index)
/// regardless of worker count. Records are borrowed read-only.
#[must_use]
pub fn match_candidates<F>(
    left: &[Record],
    right: &[Record],
    similarity: &F,
    threshold: f64,
    workers: usize,
) -> Vec<MatchCandidate>
where
    F: Fn(&str, &str) -> f64 + Sync,
{
    if left.is_empty() || right.is_empty() {
        return Vec::new();
    }

    let workers = effective_workers(workers, left.len());
    if workers <= 1 {
        return scan_shard(left, right, similarity, threshold);
    }

    let shard_size = left.len().div_ceil(workers);
    let mut shards: Vec<Vec<MatchCandidate>> = Vec::new();
    shards.resize_with(workers, Vec::new);

    std::thread::scope(|scope| {
        for (chunk, out) in left.chunks(shard_size).zip(shards.iter_mut()) {
            scope.spawn(move || {
                *out = scan_shard(chunk, right, similarity, threshold);
            });
        }
    });

    shards.into_iter().flatten().collect()
}

/// Sequential scan of one shard of left records against all of right.
fn scan_shard<F>(
    chunk: &[Record],
    right: &[Record],
    similarity: &F,
    threshold: f64,
) -> Vec<MatchCandidate>
where
    F: Fn(&str, &str) -> f64,
{
    let mut out = Vec::new();
    for left_record in chunk {
        for right_record in right {
            let score = similarity(&left_record.label, &right_record.label);
            debug_assert!(
                (0.0..=100.0).contains(&score),
                "similarity function returned {score}, outside [0, 100]"
            );
            if score >= threshold {
                out.push(MatchCandidate::new(
                    left_record.id.clone(),
                    right_record.id.clone(),
                    score,
                ));
            }
        }
    }
    out
}

fn effective_workers(configured: usize, items: usize) -> usize {
    let workers = if configured == 0 {
        std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
    } else {
        configured
    };
    workers.clamp(1, items)
}

/// Selects the best candidate per left id.
///
/// The maximum score wins; equal scores resolve to the candidate seen
/// first in the input order (an incumbent is only replaced by a strictly
/// greater score). Left ids with no candidate are simply absent from the
/// map - the result is a partial function.
#[must_use]
pub fn best_matches(candidates: &[MatchCandidate]) -> BTreeMap<String, MatchCandidate> {
    let mut best: BTreeMap<String, MatchCandidate> = BTreeMap::new();
    for candidate in candidates {
        match best.get(&candidate.left_id) {
            Some(current) if candidate.score <= current.score => {}
            _ => {
                best.insert(candidate.left_id.clone(), candidate.clone());
            }
        }
    }
    best
}
