//! Attempt classification and the bounded retry policy.
//!
//! Retry control flow is expressed through the [`Attempt`] result type
//! consumed by [`RetryPolicy::run`]; errors are never used for retry
//! control flow.

use std::future::Future;
use std::time::Duration;

/// Outcome of a single operation attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    /// The operation completed.
    Success(T),
    /// A transient failure (unreachable, throttled, conflict); eligible
    /// for retry with backoff.
    Transient(String),
    /// A fatal failure (validation, permission); never retried.
    Fatal(String),
}

/// Final outcome of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// The operation eventually succeeded.
    Succeeded {
        /// The operation result.
        value: T,
        /// Number of retries consumed before success.
        retries: u32,
    },
    /// Every attempt failed transiently and the budget ran out.
    Exhausted {
        /// The last transient error message.
        last_error: String,
        /// Number of retries consumed.
        retries: u32,
    },
    /// A fatal failure stopped the retry loop immediately.
    Fatal {
        /// The fatal error message.
        error: String,
        /// Number of retries consumed before the fatal attempt.
        retries: u32,
    },
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): base * 2^(retry-1),
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `op` until success, a fatal failure, or the retry budget is
    /// exhausted. The closure receives the attempt number (0-based).
    pub async fn run<T, F, Fut>(&self, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let mut retries = 0u32;
        loop {
            match op(retries).await {
                Attempt::Success(value) => return RetryOutcome::Succeeded { value, retries },
                Attempt::Fatal(error) => return RetryOutcome::Fatal { error, retries },
                Attempt::Transient(last_error) => {
                    if retries >= self.max_retries {
                        return RetryOutcome::Exhausted {
                            last_error,
                            retries,
                        };
                    }
                    retries += 1;
                    tokio::time::sleep(self.delay_for(retries)).await;
                }
            }
        }
    }
}
