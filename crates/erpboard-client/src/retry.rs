//! Retry with bounded exponential backoff
//!
//! Exhaustion is reported as a value, not an error, so a loader can fan
//! out over independent resources and let each one fail on its own.

use erpboard_config::FetchConfig;
use std::future::Future;
use std::time::Duration;

/// How many attempts to make and how long to wait between them
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Delay after the `failed_attempt`-th failure (1-based):
    /// `base * 2^(n-1)`, capped at `max_delay`.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Result of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T, E> {
    Success { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: E },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryOutcome::Success { value, .. } => Ok(value),
            RetryOutcome::Exhausted { last_error, .. } => Err(last_error),
        }
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` is reached.
/// The closure receives the 1-based attempt number.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    log::info!(target: "erpboard::retry", "{} succeeded on attempt {}", label, attempt);
                }
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                };
            }
            Err(error) if attempt >= policy.max_attempts => {
                log::error!(
                    target: "erpboard::retry",
                    "{} failed after {} attempts: {}",
                    label,
                    attempt,
                    error
                );
                return RetryOutcome::Exhausted {
                    attempts: attempt,
                    last_error: error,
                };
            }
            Err(error) => {
                let delay = policy.delay_after(attempt);
                log::warn!(
                    target: "erpboard::retry",
                    "{} attempt {}/{} failed: {} (retrying in {:?})",
                    label,
                    attempt,
                    policy.max_attempts,
                    error,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
