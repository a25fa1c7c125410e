//! Request/response types of the facilities API

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use super::constants::MAX_ERROR_BODY;
use super::resilience::RetryableError;
use crate::reference::record::scalar_to_string;

/// Why a job submission did not produce a created job
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl SubmitError {
    /// HTTP failure with the body cut to a diagnosable size
    pub fn http(status: u16, body: &str) -> Self {
        SubmitError::Http {
            status,
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SubmitError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn retry_class(&self) -> RetryableError {
        match self {
            SubmitError::Http { status, .. } => RetryableError::from_status_code(*status),
            SubmitError::Transport(_) => RetryableError::Network,
            SubmitError::Decode(_) => RetryableError::Unknown,
        }
    }

    /// Diagnostic record for the failures report
    pub fn to_json(&self) -> Value {
        match self {
            SubmitError::Http { status, body } => json!({"status": status, "body": body}),
            other => json!({"error": other.to_string()}),
        }
    }
}

impl From<reqwest::Error> for SubmitError {
    fn from(error: reqwest::Error) -> Self {
        SubmitError::Transport(error.to_string())
    }
}

/// Successful job-create response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedJob {
    pub id: String,
}

impl CreatedJob {
    /// Read the created id from a response body; numeric ids are accepted.
    /// Some deployments nest the entity under `data`.
    pub fn from_response(body: &Value) -> Result<Self, SubmitError> {
        let id = body
            .get("id")
            .and_then(scalar_to_string)
            .or_else(|| body.get("data").and_then(|d| d.get("id")).and_then(scalar_to_string));

        match id {
            Some(id) => Ok(Self { id }),
            None => Err(SubmitError::Decode(format!(
                "response has no 'id': {}",
                body.to_string().chars().take(MAX_ERROR_BODY).collect::<String>()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_body_truncated() {
        let long = "x".repeat(2000);
        match SubmitError::http(500, &long) {
            SubmitError::Http { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_retry_class() {
        assert!(SubmitError::http(502, "").retry_class().should_retry());
        assert!(!SubmitError::http(400, "").retry_class().should_retry());
        assert!(!SubmitError::Transport("timeout".into()).retry_class().should_retry());
    }

    #[test]
    fn test_created_job_from_response() {
        assert_eq!(CreatedJob::from_response(&json!({"id": 1234})).unwrap().id, "1234");
        assert_eq!(CreatedJob::from_response(&json!({"data": {"id": "r-9"}})).unwrap().id, "r-9");
        assert!(CreatedJob::from_response(&json!({"ok": true})).is_err());
    }

    #[test]
    fn test_failure_json() {
        assert_eq!(
            SubmitError::http(422, "bad").to_json(),
            json!({"status": 422, "body": "bad"})
        );
        assert!(SubmitError::Transport("refused".into()).to_json()["error"].is_string());
    }
}
