//! Retry, pacing and request logging for API calls

pub mod config;
pub mod logging;
pub mod rate_limiter;
pub mod retry;

pub use config::{LogLevel, MonitoringConfig, RateLimitConfig, ResilienceConfig};
pub use logging::{ApiLogger, RequestContext, redact_token};
pub use rate_limiter::{RateLimiter, RateLimiterStats};
pub use retry::{RetryConfig, RetryPolicy, RetryableError};
