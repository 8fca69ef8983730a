//! Pipeline run states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The state of a pipeline run.
///
/// Runs move `FetchingLeft -> FetchingRight -> Matching -> Done`;
/// `Failed` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Fetching the left record set.
    FetchingLeft,
    /// Fetching the right record set.
    FetchingRight,
    /// Scoring and selecting matches.
    Matching,
    /// Finished successfully.
    Done,
    /// Aborted on an unrecoverable error.
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchingLeft => write!(f, "fetching_left"),
            Self::FetchingRight => write!(f, "fetching_right"),
            Self::Matching => write!(f, "matching"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl PipelineState {
    /// Returns true for states a run cannot leave.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}
