//! Retry policy: decides whether and when a failed fetch is tried again.

use std::time::Duration;

use crate::domain::{ErrorKind, FetchError};

/// Retry policy for failed fetches.
///
/// The default makes a single attempt: a failed URL is recorded as a failure
/// and dropped from the archive, with no retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per URL, including the first one.
    pub max_attempts: u32,

    /// Base delay for the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
        }
    }

    /// `retries` extra attempts with exponential backoff starting at `base_delay`.
    pub fn exponential(retries: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            base_delay,
            multiplier: 2.0,
        }
    }

    /// Only transient errors are retried, and only while attempts remain.
    ///
    /// # Arguments
    /// * `attempts` - Number of attempts already made (1-indexed).
    pub fn should_retry(&self, attempts: u32, error: &FetchError) -> bool {
        attempts < self.max_attempts && error.kind() == ErrorKind::Transient
    }

    /// Calculate delay for the next retry based on attempt number.
    ///
    /// delay = base_delay * multiplier^(attempts - 1)
    ///
    /// Example with base_delay=200ms, multiplier=2.0:
    /// - attempt 1 (first failure): 200ms
    /// - attempt 2: 400ms
    /// - attempt 3: 800ms
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let base_secs = self.base_delay.as_secs_f64();
        let delay_secs = base_secs * self.multiplier.powi(attempts.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay_secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}
