//! Request pacing for job submissions
//!
//! Two mechanisms share this type: a token bucket that spaces consecutive job
//! requests by the configured delay, and a quota guard that pauses once the
//! server reports it is nearly out of requests.

use super::config::RateLimitConfig;
use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<BucketState>>,
    config: RateLimitConfig,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
    requests_made: u64,
    waits: u64,
    quota_pauses: u64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BucketState {
                tokens: config.burst_capacity as f64,
                last_refill: Instant::now(),
                requests_made: 0,
                waits: 0,
                quota_pauses: 0,
            })),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, BucketState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait until a request may be sent
    pub async fn acquire(&self) {
        if !self.config.enabled {
            return;
        }

        loop {
            if self.try_acquire() {
                return;
            }
            self.state().waits += 1;
            let wait = self.token_interval();
            debug!("Pacing: waiting {:?} before next request", wait);
            sleep(wait).await;
        }
    }

    /// Take a token if one is available
    pub fn try_acquire(&self) -> bool {
        if !self.config.enabled {
            return true;
        }

        let mut state = self.state();
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            state.requests_made += 1;
            true
        } else {
            false
        }
    }

    /// Pause to apply after a response reporting `remaining` requests, if any
    pub fn quota_pause(&self, remaining: Option<u32>) -> Option<Duration> {
        let remaining = remaining?;
        if remaining < self.config.low_quota_threshold && !self.config.low_quota_pause.is_zero() {
            Some(self.config.low_quota_pause)
        } else {
            None
        }
    }

    /// Sleep when the server reports a nearly exhausted quota
    pub async fn note_remaining(&self, remaining: Option<u32>) {
        if let Some(pause) = self.quota_pause(remaining) {
            warn!(
                "Rate limit nearly exhausted ({} remaining), pausing {:?}",
                remaining.unwrap_or_default(),
                pause
            );
            self.state().quota_pauses += 1;
            sleep(pause).await;
        }
    }

    pub fn stats(&self) -> RateLimiterStats {
        let state = self.state();
        RateLimiterStats {
            requests_made: state.requests_made,
            waits: state.waits,
            quota_pauses: state.quota_pauses,
            enabled: self.config.enabled,
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        let per_second = self.config.requests_per_minute as f64 / 60.0;
        let added = elapsed.as_secs_f64() * per_second;

        if added > 0.0 {
            state.tokens = (state.tokens + added).min(self.config.burst_capacity as f64);
            state.last_refill = now;
        }
    }

    fn token_interval(&self) -> Duration {
        if self.config.requests_per_minute == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(60.0 / self.config.requests_per_minute as f64)
    }
}

/// Counters for the log and the end-of-run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterStats {
    pub requests_made: u64,
    /// Times a caller had to wait for a token
    pub waits: u64,
    pub quota_pauses: u64,
    pub enabled: bool,
}
