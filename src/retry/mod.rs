//! Retry with exponential backoff for calls to external services.

#[cfg(test)]
mod tests;

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_RETRY_MULTIPLIER,
};

/// Classifies an error as transient (worth another attempt) or permanent.
pub trait Retryable {
    /// Returns `true` if the failed call may succeed when repeated.
    fn is_retryable(&self) -> bool {
        true
    }
}

#[derive(Debug, Error)]
/// Outcome of a call that did not succeed under a [`RetryPolicy`].
pub enum RetryError<E: std::error::Error + 'static> {
    /// Every permitted attempt failed with a transient error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made (equals the policy ceiling).
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        last: E,
    },

    /// A permanent error stopped retrying early.
    #[error(transparent)]
    Aborted(E),
}

impl<E: std::error::Error + 'static> RetryError<E> {
    /// Returns the underlying error from the last attempt.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Aborted(e) => e,
        }
    }

    /// Returns `true` if the ceiling was reached.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }
}

/// Attempt ceiling plus exponential backoff schedule.
///
/// The wait after the `n`th failure (1-based) is `base_delay * multiplier^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first call. Clamped to at least 1.
    pub max_attempts: u32,
    /// Wait after the first failure.
    pub base_delay: Duration,
    /// Growth factor applied after each further failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            multiplier: DEFAULT_RETRY_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
        }
    }

    /// A policy that never waits. Useful for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, 1.0)
    }

    /// Backoff to wait after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        self.base_delay.mul_f64(factor)
    }

    /// Runs `op` until it succeeds, fails permanently, or the ceiling is reached.
    ///
    /// `operation` only labels log lines.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        E: std::error::Error + Retryable + 'static,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    warn!(operation, attempt, error = %e, "Permanent failure, not retrying");
                    return Err(RetryError::Aborted(e));
                }
                Err(e) if attempt >= max_attempts => {
                    warn!(operation, attempts = attempt, error = %e, "Retries exhausted");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    log_retry(operation, attempt, max_attempts, delay, &e);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

fn log_retry(operation: &str, attempt: u32, max_attempts: u32, delay: Duration, error: &dyn Display) {
    warn!(
        operation,
        attempt,
        max_attempts,
        backoff_ms = delay.as_millis() as u64,
        error = %error,
        "Attempt failed, will retry after backoff"
    );
}
