//! Retry, pacing and logging configured from user settings

use roster_importer::api::resilience::{ApiLogger, RateLimiter, RequestContext, redact_token};
use roster_importer::api::{ResilienceConfig, RetryPolicy, RetryableError, SubmitError};
use roster_importer::config::Settings;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

fn fast_settings() -> Settings {
    Settings {
        request_delay_ms: 100,
        retry_base_delay_ms: 1,
        max_retries: 3,
        low_quota_threshold: 5,
        low_quota_pause_ms: 20,
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_settings_drive_retry_count() {
    let config = ResilienceConfig::from_settings(&fast_settings());
    let policy = RetryPolicy::new(config.retry.clone());
    let calls = Arc::new(AtomicU32::new(0));

    let result: Result<(), SubmitError> = policy
        .execute(|| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SubmitError::http(502, "bad gateway"))
            }
        })
        .await;

    assert_eq!(result.unwrap_err().retry_class(), RetryableError::ServerError(502));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_auth_failures_are_not_retried() {
    let policy = RetryPolicy::new(ResilienceConfig::from_settings(&fast_settings()).retry);
    let calls = Arc::new(AtomicU32::new(0));

    let result: Result<(), SubmitError> = policy
        .execute(|| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SubmitError::http(401, "unauthorized"))
            }
        })
        .await;

    assert_eq!(result.unwrap_err().retry_class(), RetryableError::AuthError);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_requests_spaced_by_delay() {
    let config = ResilienceConfig::from_settings(&fast_settings());
    let limiter = RateLimiter::new(config.rate_limit);

    let start = Instant::now();
    for _ in 0..3 {
        limiter.acquire().await;
    }

    // first request is immediate, the next two wait ~100ms each
    assert!(start.elapsed() >= Duration::from_millis(180));
    assert_eq!(limiter.stats().requests_made, 3);
}

#[tokio::test]
async fn test_low_quota_pauses() {
    let config = ResilienceConfig::from_settings(&fast_settings());
    let limiter = RateLimiter::new(config.rate_limit);

    let start = Instant::now();
    limiter.note_remaining(Some(2)).await;
    assert!(start.elapsed() >= Duration::from_millis(20));
    assert_eq!(limiter.stats().quota_pauses, 1);
}

#[test]
fn test_disabled_preset_sends_immediately() {
    let config = ResilienceConfig::disabled();
    let limiter = RateLimiter::new(config.rate_limit);
    for _ in 0..10 {
        assert!(limiter.try_acquire());
    }
    assert_eq!(config.retry.max_attempts, 1);
}

#[test]
fn test_logger_accepts_full_request_cycle() {
    let logger = ApiLogger::new(ResilienceConfig::default().monitoring);
    let ctx = RequestContext::new("create_job", Some(4));

    logger.log_response(&ctx, 500, Some(12));
    logger.log_retry(&ctx, 1, "HTTP 500", Duration::from_millis(1000));
    logger.log_complete(&ctx, 2, Ok("991"));

    assert_eq!(ctx.row_number, Some(4));
    assert_eq!(redact_token("tok_1234567890"), "tok_...7890");
}
