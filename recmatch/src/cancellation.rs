//! Run token for cooperative cancellation and overall deadlines.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A token scoped to one pipeline run.
///
/// Carries an optional wall-clock deadline and a cancellation flag.
/// Cancellation is idempotent - only the first reason is kept. When the
/// deadline expires mid-attempt, the retry policy abandons the in-flight
/// call and reports a timeout regardless of remaining retry budget.
#[derive(Debug, Default)]
pub struct RunToken {
    /// Whether cancellation has been requested.
    cancelled: AtomicBool,
    /// The reason for cancellation (first one wins).
    reason: RwLock<Option<String>>,
    /// Absolute deadline for the run, if any.
    deadline: Option<Instant>,
}

impl RunToken {
    /// Creates a token with no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that expires after `deadline` from now.
    #[must_use]
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            reason: RwLock::new(None),
            deadline: Some(Instant::now() + deadline),
        }
    }

    /// Requests cancellation with a reason.
    ///
    /// Idempotent - only the first reason is kept.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.reason.write() = Some(reason.into());
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Returns the time left before the deadline, or `None` when no
    /// deadline is set. A zero duration means the deadline has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns whether the deadline has passed.
    #[must_use]
    pub fn deadline_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves when the deadline passes; pends forever without one.
    ///
    /// Used to race in-flight attempts and backoff sleeps.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
