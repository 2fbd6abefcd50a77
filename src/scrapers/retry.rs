//! Exponential backoff for fetchers.
//!
//! [`RetryFetcher`] is a decorator: it implements [`Fetcher`] by delegating to
//! an inner fetcher and repeating `fetch` when the error is retryable
//! (see [`FetchError::is_retryable`]). Everything else fails immediately.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=jitter)
//! ```
//!
//! With the defaults (2 s base, 20 s cap) the waits are 2 s, 4 s, 8 s, ...

use super::Fetcher;
use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::models::ArticleRecord;
use rand::{Rng, rng};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// How many times, and how patiently, to retry a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retrying.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each one after.
    pub base_delay: Duration,
    /// Upper bound for the exponential part of the delay.
    pub max_delay: Duration,
    /// Upper bound for the random jitter added to every delay.
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Delay to wait after the `attempt`-th failure (1-based), before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(20),
            jitter: Duration::from_millis(250),
        }
    }
}

/// Wraps a [`Fetcher`] with retry on transient errors.
#[derive(Debug)]
pub struct RetryFetcher<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Fetcher> RetryFetcher<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T: Fetcher> Fetcher for RetryFetcher<T> {
    fn source_name(&self) -> &'static str {
        self.inner.source_name()
    }

    #[instrument(level = "debug", skip_all, fields(feed = %feed.name))]
    async fn fetch(&self, feed: &FeedConfig) -> Result<Vec<ArticleRecord>, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch(feed).await {
                Ok(records) => return Ok(records),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() || attempt >= self.policy.max_attempts {
                        if attempt > 1 {
                            error!(
                                attempt,
                                max = self.policy.max_attempts,
                                elapsed_ms_total = total_dt.as_millis(),
                                error = %e,
                                "fetch exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    let jitter_ms = self.policy.jitter.as_millis() as u64;
                    let jitter_ms: u64 = if jitter_ms == 0 {
                        0
                    } else {
                        rng().random_range(0..=jitter_ms)
                    };
                    let delay = self.policy.backoff(attempt) + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.policy.max_attempts,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    async fn enrich(&self, record: ArticleRecord) -> ArticleRecord {
        self.inner.enrich(record).await
    }
}
