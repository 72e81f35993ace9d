//! Bounded retry with exponential backoff for a single provider.
//!
//! The delay after failed attempt `n` (1-based) is
//! `multiplier * 2^(n-1)` seconds, clamped into `[min_delay, max_delay]`.
//! Only [`crate::error::Error::is_retryable`] failures are retried; anything else is
//! returned after the first attempt.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::Result;

use super::types::TaskComplexity;

/// Retry settings for one provider attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Seconds scaled by `2^(n-1)` after attempt `n`
    pub multiplier: f64,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: 1.0,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_delay_bounds(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay.max(min_delay);
        self
    }

    /// Wait after failed attempt `attempt` (1-based).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let secs = self.multiplier * 2f64.powi(exponent);
        let raw = if secs.is_nan() || secs <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        };
        raw.clamp(self.min_delay, self.max_delay.max(self.min_delay))
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out.
    ///
    /// `provider` and `complexity` only feed the log fields.
    pub async fn execute<F, Fut, T>(
        &self,
        provider: &str,
        complexity: TaskComplexity,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(provider, %complexity, attempt, "Calling provider");

            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(provider, attempt, "Provider succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            warn!(
                operation = "complete",
                provider,
                %complexity,
                attempt,
                error = %err,
                "Provider attempt failed"
            );

            if !err.is_retryable() {
                debug!(provider, "Error is non-retryable, stopping");
                return Err(err);
            }
            if attempt >= max_attempts {
                return Err(err);
            }

            let delay = self.backoff_for_attempt(attempt);
            debug!(provider, attempt, delay_ms = delay.as_millis() as u64, "Backing off");
            sleep(delay).await;
        }
    }
}
