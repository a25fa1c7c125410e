//! Backoff for job submissions
//!
//! Only server-side failures (5xx) are retried. A 4xx means the payload or the
//! credentials are wrong and sending it again cannot help.

use log::{debug, info, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::api::models::SubmitError;

/// How many times to send, and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Failure classes as far as retrying is concerned
#[derive(Debug, Clone, PartialEq)]
pub enum RetryableError {
    /// Network-level errors (connection refused, DNS, timeouts)
    Network,
    /// 5xx, the only retryable class
    ServerError(u16),
    /// 429; pacing is left to the rate limiter
    RateLimited,
    /// Non-retryable client errors (4xx)
    ClientError(u16),
    /// HTTP 401/403
    AuthError,
    /// Anything outside 4xx/5xx
    Unknown,
}

impl RetryableError {
    pub fn should_retry(&self) -> bool {
        matches!(self, RetryableError::ServerError(_))
    }

    pub fn from_status_code(status: u16) -> Self {
        match status {
            401 | 403 => RetryableError::AuthError,
            429 => RetryableError::RateLimited,
            400..=499 => RetryableError::ClientError(status),
            500..=599 => RetryableError::ServerError(status),
            _ => RetryableError::Unknown,
        }
    }
}

/// Retry policy implementing exponential backoff with optional jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, SubmitError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SubmitError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        info!("Operation succeeded after {} attempts", attempt);
                    }
                    return Ok(result);
                }
                Err(error) => {
                    let should_retry = error.retry_class().should_retry();

                    if !should_retry || attempt >= max_attempts {
                        warn!(
                            "Operation failed permanently on attempt {} (should_retry: {}): {}",
                            attempt, should_retry, error
                        );
                        return Err(error);
                    }

                    let delay = self.calculate_delay(attempt);
                    warn!("Operation failed on attempt {} (retryable): {}", attempt, error);
                    debug!("Waiting {:?} before retry", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Delay before the retry following `attempt`: base, 2x base, 4x base...
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.config.base_delay.as_millis() as f64)
            * self.config.backoff_multiplier.powi(attempt as i32 - 1);

        let mut delay = Duration::from_millis(delay_ms as u64).min(self.config.max_delay);

        if self.config.jitter {
            let jitter_factor = rand::rng().random_range(0.5..=1.5);
            delay = Duration::from_millis((delay.as_millis() as f64 * jitter_factor) as u64);
        }

        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::ZERO,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn test_status_code_classification() {
        assert_eq!(RetryableError::from_status_code(401), RetryableError::AuthError);
        assert_eq!(RetryableError::from_status_code(429), RetryableError::RateLimited);
        assert_eq!(RetryableError::from_status_code(422), RetryableError::ClientError(422));
        assert_eq!(RetryableError::from_status_code(503), RetryableError::ServerError(503));

        assert!(RetryableError::ServerError(500).should_retry());
        assert!(!RetryableError::ClientError(400).should_retry());
        assert!(!RetryableError::RateLimited.should_retry());
        assert!(!RetryableError::Network.should_retry());
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(RetryConfig {
            base_delay: Duration::from_millis(1000),
            ..RetryConfig::default()
        });

        assert_eq!(policy.calculate_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.calculate_delay(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = RetryPolicy::new(RetryConfig {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            ..RetryConfig::default()
        });

        assert_eq!(policy.calculate_delay(10), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_retries_server_errors_until_success() {
        let policy = RetryPolicy::new(instant_config(3));
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .execute(|| {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(SubmitError::http(503, "busy"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(instant_config(3));
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(SubmitError::http(500, "boom"))
                }
            })
            .await;

        assert_eq!(result.unwrap_err().status(), Some(500));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let policy = RetryPolicy::new(instant_config(3));
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = policy
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(SubmitError::http(422, "bad payload"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
