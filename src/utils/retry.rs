//! Retry with backoff for transient upstream failures.
//!
//! A bounded loop: the first attempt plus at most `max_retries` retries.
//! Rate limits sleep for the server's `Retry-After` (or the default
//! cooldown), other transient failures sleep a short fixed delay. The last
//! error is returned unchanged once the budget is spent.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::ClientConfig;

/// Retry budget and delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Cooldown after a rate limit without a server hint
    pub rate_limit_cooldown: Duration,
    /// Pause before retrying other transient failures
    pub retry_delay: Duration,
}

impl RetryPolicy {
    /// How long to wait before retrying after `error`.
    pub fn delay_for(&self, error: &AppError) -> Duration {
        match error {
            AppError::RateLimited { retry_after } => {
                retry_after.unwrap_or(self.rate_limit_cooldown)
            }
            _ => self.retry_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rate_limit_cooldown: Duration::from_secs(60),
            retry_delay: Duration::from_millis(1500),
        }
    }
}

impl From<&ClientConfig> for RetryPolicy {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            rate_limit_cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Run `op` until it succeeds, fails terminally, or the budget is spent.
///
/// `label` identifies the operation in retry logs.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(&error);
                if matches!(error, AppError::RateLimited { .. }) {
                    log::warn!(
                        "[429] {}: cooling down for {}ms ({}/{})",
                        label,
                        delay.as_millis(),
                        attempt,
                        policy.max_retries
                    );
                } else {
                    log::warn!(
                        "[Retry] {}: {} ({}/{})",
                        label,
                        error,
                        attempt,
                        policy.max_retries
                    );
                }
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                if error.is_transient() {
                    log::error!(
                        "{}: giving up after {} retries: {}",
                        label,
                        policy.max_retries,
                        error
                    );
                }
                return Err(error);
            }
        }
    }
}
