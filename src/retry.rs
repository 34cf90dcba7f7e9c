//! Retry policies
//!
//! Page fetches retry on a fixed delay; embedding requests back off exponentially.

use std::future::Future;
use std::time::Duration;

/// How long to wait between attempts, and how many attempts to make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Same delay before every retry; `max_retries` retries after the first attempt
    Fixed { delay: Duration, max_retries: u32 },
    /// Delay of `base * 2^n` after the n-th failed attempt (0-based); `max_attempts` in total
    Exponential { base: Duration, max_attempts: u32 },
}

impl RetryPolicy {
    /// Total number of attempts the policy allows
    pub fn max_attempts(&self) -> u32 {
        match *self {
            Self::Fixed { max_retries, .. } => max_retries.saturating_add(1),
            Self::Exponential { max_attempts, .. } => max_attempts,
        }
    }

    /// Whether another attempt is allowed after `attempt` (0-based) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts()
    }

    /// Delay to wait after `attempt` (0-based) failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Fixed { delay, .. } => delay,
            Self::Exponential { base, .. } => base.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }
}

/// Runs `op` until it succeeds, the policy is exhausted, or an error is not transient
///
/// `op` receives the 0-based attempt number. The last error is returned on failure.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) && policy.should_retry(attempt) => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, ?delay, error = %e, "Transient failure, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
