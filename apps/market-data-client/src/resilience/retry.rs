//! Retry with exponential backoff for data fetch operations.
//!
//! Retries are bounded and jittered, and they respect the error taxonomy:
//! only transient failures are attempted again. A circuit-open rejection
//! aborts the loop immediately, since retrying it would re-incur the load
//! the breaker is shedding, and the final failure propagates the last
//! error unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use market_data_client::resilience::{RetryPolicy, retry_with_backoff};
//!
//! let policy = RetryPolicy::default();
//! let quote = retry_with_backoff(&policy, "quote", || async {
//!     breaker.execute("quote", || api.fetch_quote("AAPL")).await
//! })
//! .await?;
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use crate::error::DataError;

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first (default: 3).
    pub max_attempts: u32,
    /// Delay before the first retry (default: 1s).
    pub base_delay: Duration,
    /// Backoff multiplier for exponential growth (default: 2.0).
    pub backoff_multiplier: f64,
    /// Jitter factor for randomization (default: 0.2 = ±20%).
    pub jitter_factor: f64,
    /// Maximum backoff delay (default: 30s).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Calculator for the sequence of backoff delays within one operation.
#[derive(Debug)]
pub struct BackoffSchedule {
    retries_used: u32,
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl BackoffSchedule {
    /// Create a schedule from a retry policy.
    ///
    /// A policy of `max_attempts` total invocations yields
    /// `max_attempts - 1` delays.
    #[must_use]
    pub const fn new(policy: &RetryPolicy) -> Self {
        Self {
            retries_used: 0,
            max_retries: policy.max_attempts.saturating_sub(1),
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Get the next backoff delay with jitter.
    ///
    /// Returns `None` once the attempt budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries_used >= self.max_retries {
            return None;
        }

        let base_ms = self.base_delay_ms_for(self.retries_used);
        let jittered_ms = self.apply_jitter(base_ms).min(self.max_delay_ms);
        self.retries_used += 1;

        Some(Duration::from_millis(jittered_ms))
    }

    /// Number of retries handed out so far.
    #[must_use]
    pub const fn retries_used(&self) -> u32 {
        self.retries_used
    }

    /// Base exponential delay for the given retry index, without jitter.
    fn base_delay_ms_for(&self, retry: u32) -> u64 {
        let multiplier = self.backoff_multiplier.powi(retry as i32);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = (self.base_delay_ms as f64 * multiplier) as u64;
        delay.min(self.max_delay_ms)
    }

    /// Randomize a delay into [delay * (1 - jitter), delay * (1 + jitter)].
    fn apply_jitter(&self, delay_ms: u64) -> u64 {
        let jitter_range = delay_ms as f64 * self.jitter_factor;
        let min = (delay_ms as f64 - jitter_range).max(0.0);
        let max = delay_ms as f64 + jitter_range;

        let mut rng = rand::rng();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let jittered = rng.random_range(min..=max) as u64;
        jittered
    }
}

/// Execute an operation with bounded retry and exponential backoff.
///
/// The operation runs at most `policy.max_attempts` times. Non-retryable
/// errors abort immediately; when the budget is exhausted the last error
/// propagates unchanged.
///
/// # Errors
///
/// Returns the operation's final error.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, DataError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DataError>>,
{
    let mut backoff = BackoffSchedule::new(policy);

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => {
                tracing::debug!(label, error = %err, "Not retryable, failing fast");
                return Err(err);
            }
            Err(err) => {
                let Some(delay) = backoff.next_delay() else {
                    tracing::warn!(
                        label,
                        attempts = policy.max_attempts,
                        error = %err,
                        "Retry budget exhausted"
                    );
                    return Err(err);
                };

                tracing::warn!(
                    label,
                    retry = backoff.retries_used(),
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
