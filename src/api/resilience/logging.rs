//! Structured request logging for the facilities API
//!
//! Every line is a JSON object so a run's log file can be filtered by event,
//! row or status. Bearer tokens never reach the log in full.

use super::config::{LogLevel, MonitoringConfig};
use log::{debug, error, info, warn};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ApiLogger {
    config: MonitoringConfig,
}

/// One logical API call, possibly spanning several attempts
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub operation: String,
    /// Source row of a job submission
    pub row_number: Option<usize>,
    pub started: Instant,
}

impl RequestContext {
    pub fn new(operation: &str, row_number: Option<usize>) -> Self {
        Self {
            operation: operation.to_string(),
            row_number,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl ApiLogger {
    pub fn new(config: MonitoringConfig) -> Self {
        Self { config }
    }

    pub fn log_request(&self, ctx: &RequestContext, method: &str, url: &str, headers: &HashMap<String, String>) {
        if !self.config.request_logging || !self.should_log(LogLevel::Debug) {
            return;
        }

        let entry = json!({
            "event": "http_request",
            "operation": ctx.operation,
            "row": ctx.row_number,
            "method": method,
            "url": url,
            "headers": sanitize_headers(headers),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        debug!("HTTP Request: {}", entry);
    }

    pub fn log_response(&self, ctx: &RequestContext, status: u16, remaining: Option<u32>) {
        if !self.config.request_logging {
            return;
        }

        let entry = json!({
            "event": "http_response",
            "operation": ctx.operation,
            "row": ctx.row_number,
            "status": status,
            "rate_limit_remaining": remaining,
            "duration_ms": ctx.elapsed().as_millis(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if status >= 400 {
            if self.should_log(LogLevel::Warn) {
                warn!("HTTP Response (Error): {}", entry);
            }
        } else if self.should_log(LogLevel::Debug) {
            debug!("HTTP Response: {}", entry);
        }
    }

    pub fn log_retry(&self, ctx: &RequestContext, attempt: u32, error: &str, delay: Duration) {
        if !self.should_log(LogLevel::Warn) {
            return;
        }

        let entry = json!({
            "event": "retry_attempt",
            "operation": ctx.operation,
            "row": ctx.row_number,
            "attempt": attempt,
            "error": error,
            "delay_ms": delay.as_millis(),
        });
        warn!("Retry Attempt: {}", entry);
    }

    /// Final outcome of a call; `result` is the created id or the error text
    pub fn log_complete(&self, ctx: &RequestContext, attempts: u32, result: Result<&str, &str>) {
        let mut entry = json!({
            "event": "request_completed",
            "operation": ctx.operation,
            "row": ctx.row_number,
            "attempts": attempts,
            "duration_ms": ctx.elapsed().as_millis(),
        });

        match result {
            Ok(id) => {
                entry["id"] = Value::from(id);
                if self.should_log(LogLevel::Info) {
                    info!("API Request Completed: {}", entry);
                }
            }
            Err(message) => {
                entry["error"] = Value::from(message);
                if self.should_log(LogLevel::Error) {
                    error!("API Request Failed: {}", entry);
                }
            }
        }
    }

    fn should_log(&self, level: LogLevel) -> bool {
        level <= self.config.log_level
    }
}

/// Redact credential-bearing headers
pub fn sanitize_headers(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(key, value)| {
            let lower = key.to_lowercase();
            if lower.contains("authorization") || lower.contains("token") || lower.contains("key") {
                (key.clone(), "[REDACTED]".to_string())
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

/// Short form of a token for display: first and last four characters
pub fn redact_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
