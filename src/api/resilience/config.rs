//! Retry, pacing and logging settings, derived from user [`Settings`](crate::config::Settings)

use super::retry::RetryConfig;
use crate::config::Settings;
use std::time::Duration;

/// Retry, pacing and request-logging settings for one client
#[derive(Debug, Clone, Default)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst_capacity: u32,
    pub enabled: bool,
    /// Pause once `X-RateLimit-Remaining` drops below this
    pub low_quota_threshold: u32,
    pub low_quota_pause: Duration,
}

#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub request_logging: bool,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::from_delay(Duration::from_millis(1000), 5, Duration::from_millis(2000))
    }
}

impl RateLimitConfig {
    /// One request per `delay`; a zero delay turns pacing off
    pub fn from_delay(delay: Duration, low_quota_threshold: u32, low_quota_pause: Duration) -> Self {
        let delay_ms = delay.as_millis() as u64;
        let enabled = delay_ms > 0;
        let requests_per_minute = if enabled {
            (60_000 / delay_ms).max(1) as u32
        } else {
            0
        };

        Self {
            requests_per_minute,
            burst_capacity: 1,
            enabled,
            low_quota_threshold,
            low_quota_pause,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            request_logging: true,
            log_level: LogLevel::Info,
        }
    }
}

impl ResilienceConfig {
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::builder()
            .max_retries(settings.max_retries)
            .retry_base_delay(Duration::from_millis(settings.retry_base_delay_ms))
            .rate_limit(RateLimitConfig::from_delay(
                Duration::from_millis(settings.request_delay_ms),
                settings.low_quota_threshold,
                Duration::from_millis(settings.low_quota_pause_ms),
            ))
            .request_logging(settings.request_logging)
            .build()
    }

    /// No retries, no pacing, no request logging
    pub fn disabled() -> Self {
        Self {
            retry: RetryConfig::none(),
            rate_limit: RateLimitConfig::from_delay(Duration::ZERO, 0, Duration::ZERO),
            monitoring: MonitoringConfig {
                request_logging: false,
                log_level: LogLevel::Error,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts.max(1);
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry.base_delay = delay;
        self
    }

    pub fn retry_jitter(mut self, jitter: bool) -> Self {
        self.config.retry.jitter = jitter;
        self
    }

    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.config.monitoring.request_logging = enabled;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.monitoring.log_level = level;
        self
    }

    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_defaults() {
        let config = ResilienceConfig::from_settings(&Settings::default());

        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(1000));
        assert_eq!(config.rate_limit.requests_per_minute, 60);
        assert_eq!(config.rate_limit.burst_capacity, 1);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.low_quota_threshold, 5);
        assert_eq!(config.rate_limit.low_quota_pause, Duration::from_millis(2000));
    }

    #[test]
    fn test_zero_delay_disables_pacing() {
        let settings = Settings {
            request_delay_ms: 0,
            ..Settings::default()
        };
        assert!(!ResilienceConfig::from_settings(&settings).rate_limit.enabled);
    }

    #[test]
    fn test_builder_clamps_attempts() {
        let config = ResilienceConfig::builder()
            .max_retries(0)
            .retry_jitter(true)
            .log_level(LogLevel::Debug)
            .build();

        assert_eq!(config.retry.max_attempts, 1);
        assert!(config.retry.jitter);
        assert_eq!(config.monitoring.log_level, LogLevel::Debug);
    }
}
