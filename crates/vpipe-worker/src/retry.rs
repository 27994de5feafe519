//! Retry helpers for broker bookkeeping.
//!
//! Acks and dead-letter moves go to Redis; a dropped connection there must
//! not leave a finished job pending, so those calls get a few quick retries.
//! Receive loops use [`FailureTracker`] to keep an outage from flooding logs.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Backoff policy for a named operation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles afterwards.
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub operation: &'static str,
}

impl RetryPolicy {
    pub fn new(operation: &'static str) -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            operation,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `retry` (1-based).
    fn delay_before(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Outcome of [`retry_async`].
#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),
    /// Every attempt failed; `error` is the last one.
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryResult::Success(_))
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(v) => Ok(v),
            RetryResult::Failed { error, .. } => Err(error),
        }
    }
}

/// Run `operation` until it succeeds or the policy is exhausted.
///
/// # Example
/// ```ignore
/// let policy = RetryPolicy::new("ack");
/// retry_async(&policy, || broker.ack(&id)).await;
/// ```
pub async fn retry_async<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retry = 0u32;

    loop {
        match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) if retry < policy.max_retries => {
                retry += 1;
                let delay = policy.delay_before(retry);
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    policy.operation, retry, delay, e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return RetryResult::Failed {
                    error: e,
                    attempts: retry + 1,
                }
            }
        }
    }
}

/// Counts consecutive failures of a repeating operation and tells the caller
/// when to stop logging them.
#[derive(Debug, Default)]
pub struct FailureTracker {
    consecutive_failures: u32,
    max_logged_failures: u32,
}

impl FailureTracker {
    pub fn new(max_logged_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_logged_failures,
        }
    }

    pub fn record_success(&mut self) {
        if self.consecutive_failures > self.max_logged_failures {
            debug!(
                "Operation recovered after {} consecutive failures",
                self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;
    }

    /// Returns `true` if this failure should be logged.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;

        if self.consecutive_failures == self.max_logged_failures + 1 {
            warn!(
                "Suppressing further failure logs after {} consecutive failures",
                self.max_logged_failures
            );
        }
        self.consecutive_failures <= self.max_logged_failures
    }

    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures
    }

    /// Sleep length after the current failure streak, capped at `max`.
    pub fn backoff(&self, base: Duration, max: Duration) -> Duration {
        let factor = 2u32.saturating_pow(self.consecutive_failures.saturating_sub(1).min(16));
        base.saturating_mul(factor).min(max)
    }
}
