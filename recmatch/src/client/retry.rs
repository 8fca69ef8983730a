//! Retry policy with configurable backoff and jitter.
//!
//! Wraps a single-attempt request primitive with bounded retry
//! semantics. This is the only layer allowed to swallow an error and
//! re-attempt; everything else propagates failures unchanged.
//!
//! With exponential backoff and no jitter (the defaults), the sleep
//! before re-attempt `n` (1-indexed) is `base_delay * 2^(n-1)`, each
//! delay capped at `max_delay_ms`, so a fully exhausted execution sleeps
//! `base_delay * (2^(max_attempts-1) - 1)` in total — bounded above by
//! [`crate::config::RetryConfig::max_total_delay`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::cancellation::RunToken;
use crate::client::outcome::RequestOutcome;
use crate::config::RetryConfig;
use crate::errors::FailureKind;

/// Backoff strategy for retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * 2^attempt
    #[default]
    Exponential,
    /// delay = base * (attempt + 1)
    Linear,
    /// delay = base (constant)
    Constant,
}

/// Jitter strategy to prevent thundering herd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter. The default, so the documented sleep bound holds
    /// exactly.
    #[default]
    None,
    /// Random from 0 to delay.
    Full,
    /// Half fixed, half random.
    Equal,
}

/// Applies the configured jitter to a computed delay.
#[must_use]
pub fn apply_jitter(strategy: JitterStrategy, delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    let jittered = match strategy {
        JitterStrategy::None => delay_ms,
        JitterStrategy::Full => {
            if delay_ms == 0 {
                0
            } else {
                rand::thread_rng().gen_range(0..=delay_ms)
            }
        }
        JitterStrategy::Equal => {
            let half = delay_ms / 2;
            if half == 0 {
                delay_ms
            } else {
                half + rand::thread_rng().gen_range(0..=half)
            }
        }
    };
    Duration::from_millis(jittered)
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// Attempts are exhausted, give up.
    GiveUp,
    /// The failure class is not retryable.
    NotRetryable,
}

/// Decides what to do after a failed attempt.
///
/// `attempt` is the 1-indexed number of the attempt that just failed.
#[must_use]
pub fn decide<P>(config: &RetryConfig, retryable: &P, kind: FailureKind, attempt: u32) -> RetryDecision
where
    P: Fn(FailureKind) -> bool,
{
    if !retryable(kind) {
        return RetryDecision::NotRetryable;
    }
    if attempt >= config.max_attempts {
        return RetryDecision::GiveUp;
    }
    let delay = apply_jitter(config.jitter, config.delay_for_attempt(attempt - 1));
    RetryDecision::Retry(delay)
}

/// Executes a single-attempt operation with bounded retries.
///
/// Attempt 1 runs immediately. A retryable failure with attempts
/// remaining sleeps the backoff delay and re-attempts; a non-retryable
/// failure or exhaustion returns `Failure` carrying the true attempt
/// count. Attempts within one execution are strictly sequential.
///
/// The run token's deadline overrides the remaining retry budget: when
/// it expires mid-attempt or mid-sleep, the in-flight work is abandoned
/// and a `Timeout` failure is returned immediately.
pub async fn execute_with_retry<F, Fut, P>(
    config: &RetryConfig,
    key: &str,
    token: &RunToken,
    retryable: P,
    mut attempt_fn: F,
) -> RequestOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RequestOutcome>,
    P: Fn(FailureKind) -> bool,
{
    let mut attempts: u32 = 0;

    loop {
        if token.is_cancelled() {
            let reason = token.reason().unwrap_or_else(|| "cancelled".to_string());
            return RequestOutcome::failure(FailureKind::Cancelled, reason)
                .with_attempts(attempts.max(1));
        }
        if token.deadline_expired() {
            return RequestOutcome::failure(FailureKind::Timeout, "run deadline exceeded")
                .with_attempts(attempts.max(1));
        }

        attempts += 1;
        let outcome = tokio::select! {
            outcome = attempt_fn() => outcome,
            () = token.expired() => {
                tracing::warn!(key, attempt = attempts, "Run deadline expired mid-attempt, abandoning");
                return RequestOutcome::failure(FailureKind::Timeout, "run deadline exceeded")
                    .with_attempts(attempts);
            }
        };

        match outcome.failure_kind() {
            None => return outcome.with_attempts(attempts),
            Some(kind) => match decide(config, &retryable, kind, attempts) {
                RetryDecision::Retry(delay) => {
                    tracing::debug!(
                        key,
                        attempt = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        kind = %kind,
                        "Retrying after failure"
                    );
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = token.expired() => {
                            return RequestOutcome::failure(
                                FailureKind::Timeout,
                                "run deadline exceeded",
                            )
                            .with_attempts(attempts);
                        }
                    }
                }
                RetryDecision::GiveUp => {
                    tracing::warn!(key, attempts, kind = %kind, "Retries exhausted");
                    return outcome.with_attempts(attempts);
                }
                RetryDecision::NotRetryable => {
                    return outcome.with_attempts(attempts);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::outcome::ResponseBody;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn quick_config(max_attempts: u32) -> RetryConfig {
        RetryConfig::new()
            .with_max_attempts(max_attempts)
            .with_base_delay_ms(1)
    }

    fn scripted(outcomes: Vec<RequestOutcome>) -> impl FnMut() -> std::future::Ready<RequestOutcome> {
        let mut queue: VecDeque<RequestOutcome> = outcomes.into();
        move || {
            let outcome = queue
                .pop_front()
                .unwrap_or_else(|| RequestOutcome::failure(FailureKind::Internal, "script exhausted"));
            std::future::ready(outcome)
        }
    }

    fn ok_outcome() -> RequestOutcome {
        RequestOutcome::success(200, ResponseBody::Json(serde_json::json!([])))
    }

    fn server_error() -> RequestOutcome {
        RequestOutcome::http_failure(FailureKind::Server, 503, "HTTP 503: unavailable")
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let token = RunToken::new();
        let outcome = execute_with_retry(
            &quick_config(3),
            "test",
            &token,
            FailureKind::is_retryable,
            scripted(vec![ok_outcome()]),
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 1);
    }

    #[tokio::test]
    async fn test_503_twice_then_200_succeeds_on_third_attempt() {
        let token = RunToken::new();
        let outcome = execute_with_retry(
            &quick_config(3),
            "test",
            &token,
            FailureKind::is_retryable,
            scripted(vec![server_error(), server_error(), ok_outcome()]),
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 3);
    }

    #[tokio::test]
    async fn test_client_error_fails_immediately_without_sleep() {
        let token = RunToken::new();
        let config = RetryConfig::new().with_max_attempts(3).with_base_delay_ms(60_000);

        let started = Instant::now();
        let outcome = execute_with_retry(
            &config,
            "test",
            &token,
            FailureKind::is_retryable,
            scripted(vec![RequestOutcome::http_failure(
                FailureKind::Client,
                404,
                "HTTP 404: not found",
            )]),
        )
        .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Client));
        assert_eq!(outcome.attempts(), 1);
        // No backoff sleep happened; with one, this would take a minute.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_exhaustion_performs_exactly_max_attempts() {
        let token = RunToken::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let outcome = execute_with_retry(
            &quick_config(3),
            "test",
            &token,
            FailureKind::is_retryable,
            move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                std::future::ready(server_error())
            },
        )
        .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Server));
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exponential_backoff_sleep_total() {
        let token = RunToken::new();
        let config = RetryConfig::new()
            .with_max_attempts(3)
            .with_base_delay_ms(20)
            .with_jitter(JitterStrategy::None);

        let started = Instant::now();
        let outcome = execute_with_retry(
            &config,
            "test",
            &token,
            FailureKind::is_retryable,
            scripted(vec![server_error(), server_error(), server_error()]),
        )
        .await;
        let elapsed = started.elapsed();

        assert_eq!(outcome.attempts(), 3);
        // Two inter-attempt sleeps: 20ms + 40ms.
        assert!(elapsed >= Duration::from_millis(60), "elapsed {elapsed:?}");
        assert!(elapsed < config.max_total_delay(), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn test_deadline_abandons_in_flight_attempt() {
        let token = RunToken::with_deadline(Duration::from_millis(20));
        let config = RetryConfig::new().with_max_attempts(5).with_base_delay_ms(1);

        let outcome = execute_with_retry(
            &config,
            "test",
            &token,
            FailureKind::is_retryable,
            || async {
                std::future::pending::<()>().await;
                ok_outcome()
            },
        )
        .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Timeout));
        assert_eq!(outcome.attempts(), 1);
    }

    #[tokio::test]
    async fn test_deadline_overrides_remaining_retry_budget() {
        let token = RunToken::with_deadline(Duration::from_millis(30));
        let config = RetryConfig::new()
            .with_max_attempts(10)
            .with_base_delay_ms(25);

        let outcome = execute_with_retry(
            &config,
            "test",
            &token,
            FailureKind::is_retryable,
            scripted(vec![server_error(); 10]),
        )
        .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Timeout));
        assert!(outcome.attempts() < 10);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let token = RunToken::new();
        token.cancel("operator stop");

        let outcome = execute_with_retry(
            &quick_config(3),
            "test",
            &token,
            FailureKind::is_retryable,
            scripted(vec![ok_outcome()]),
        )
        .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Cancelled));
    }

    #[test]
    fn test_decide_not_retryable() {
        let config = quick_config(3);
        let decision = decide(&config, &FailureKind::is_retryable, FailureKind::Client, 1);
        assert_eq!(decision, RetryDecision::NotRetryable);

        let decision = decide(&config, &FailureKind::is_retryable, FailureKind::Config, 1);
        assert_eq!(decision, RetryDecision::NotRetryable);
    }

    #[test]
    fn test_decide_gives_up_at_max_attempts() {
        let config = quick_config(3);
        let decision = decide(&config, &FailureKind::is_retryable, FailureKind::Server, 3);
        assert_eq!(decision, RetryDecision::GiveUp);
    }

    #[test]
    fn test_decide_retries_with_doubling_delay() {
        let config = RetryConfig::new()
            .with_max_attempts(4)
            .with_base_delay_ms(100)
            .with_jitter(JitterStrategy::None);

        let decision = decide(&config, &FailureKind::is_retryable, FailureKind::Timeout, 1);
        assert_eq!(decision, RetryDecision::Retry(Duration::from_millis(100)));

        let decision = decide(&config, &FailureKind::is_retryable, FailureKind::Timeout, 2);
        assert_eq!(decision, RetryDecision::Retry(Duration::from_millis(200)));

        let decision = decide(&config, &FailureKind::is_retryable, FailureKind::Timeout, 3);
        assert_eq!(decision, RetryDecision::Retry(Duration::from_millis(400)));
    }

    #[test]
    fn test_full_jitter_bounded_by_delay() {
        for _ in 0..10 {
            let jittered = apply_jitter(JitterStrategy::Full, Duration::from_millis(100));
            assert!(jittered <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_equal_jitter_at_least_half() {
        for _ in 0..10 {
            let jittered = apply_jitter(JitterStrategy::Equal, Duration::from_millis(100));
            assert!(jittered >= Duration::from_millis(50));
            assert!(jittered <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_no_jitter_is_identity() {
        let delay = Duration::from_millis(250);
        assert_eq!(apply_jitter(JitterStrategy::None, delay), delay);
    }
}
