//! Configuration types for the fetch and match pipeline.
//!
//! All state that the corpus kept in module-level singletons (sessions,
//! caches) lives here instead: an explicit configuration struct passed
//! into constructors, scoped to one orchestrator run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::client::retry::{BackoffStrategy, JitterStrategy};
use crate::matching::SimilarityKind;

/// Configuration for the HTTP connection manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL requests are resolved against. Must be non-empty and
    /// well-formed.
    #[serde(default)]
    pub base_url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Default headers merged into every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("recmatch/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Creates a new client config with defaults.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a default header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Gets the timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration for retry behavior.
///
/// With the default exponential backoff and no jitter, the total
/// wall-clock sleep before giving up is bounded by
/// `base_delay_ms * (2^max_attempts - 1)`; see
/// [`RetryConfig::max_total_delay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts, including the initial one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap applied to any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Backoff strategy.
    #[serde(default)]
    pub backoff: BackoffStrategy,
    /// Jitter strategy. Defaults to none so the documented sleep bound
    /// holds exactly.
    #[serde(default)]
    pub jitter: JitterStrategy,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff: BackoffStrategy::default(),
            jitter: JitterStrategy::default(),
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Calculates the backoff delay for a 0-indexed attempt, before
    /// jitter, capped at `max_delay_ms`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms;
        let delay = match self.backoff {
            BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(attempt)),
            BackoffStrategy::Linear => base.saturating_mul(u64::from(attempt) + 1),
            BackoffStrategy::Constant => base,
        };
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Worst-case total sleep across a full execution with the default
    /// exponential backoff and no jitter:
    /// `base_delay_ms * (2^max_attempts - 1)`, ignoring the per-delay cap.
    ///
    /// Callers can use this to bound the latency of a fully exhausted
    /// retry sequence.
    #[must_use]
    pub fn max_total_delay(&self) -> Duration {
        let factor = 2u64
            .saturating_pow(self.max_attempts)
            .saturating_sub(1);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Configuration for the fuzzy match engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Minimum similarity score, in [0, 100], for a pair to become a
    /// candidate.
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,
    /// Which built-in similarity function to use.
    #[serde(default)]
    pub similarity: SimilarityKind,
    /// Worker threads for the cartesian scoring loop. Zero means one per
    /// available core.
    #[serde(default)]
    pub workers: usize,
}

fn default_threshold() -> f64 {
    40.0
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_threshold(),
            similarity: SimilarityKind::default(),
            workers: 0,
        }
    }
}

impl MatchConfig {
    /// Creates a new match config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the similarity threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Sets the similarity function.
    #[must_use]
    pub fn with_similarity(mut self, kind: SimilarityKind) -> Self {
        self.similarity = kind;
        self
    }

    /// Sets the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// Combined configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// HTTP client settings shared by the sources (per-source base URLs
    /// override `client.base_url`).
    #[serde(default)]
    pub client: ClientConfig,
    /// Retry behavior for every fetch.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Match engine settings.
    #[serde(default)]
    pub matching: MatchConfig,
    /// Whether HTTP responses are decoded as JSON.
    #[serde(default = "default_expect_json")]
    pub expect_json: bool,
    /// Overall run deadline in milliseconds. Overrides any remaining
    /// retry budget once exceeded.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

fn default_expect_json() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            retry: RetryConfig::default(),
            matching: MatchConfig::default(),
            expect_json: default_expect_json(),
            deadline_ms: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a new pipeline config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the client config.
    #[must_use]
    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }

    /// Sets the retry config.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the match config.
    #[must_use]
    pub fn with_matching(mut self, matching: MatchConfig) -> Self {
        self.matching = matching;
        self
    }

    /// Sets the overall run deadline.
    #[must_use]
    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }
}
