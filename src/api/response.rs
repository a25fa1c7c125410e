//! Normalization of list responses
//!
//! List endpoints answer either with a bare array or with an object that
//! nests the array under one of several keys. Everything past this module
//! only sees a plain `Vec<Value>`.

use anyhow::{Result, anyhow};
use serde_json::Value;

/// Extract the record list from a response body.
///
/// `null` and an empty object count as an empty list; any other shape is an
/// error naming the keys that were found.
pub fn unwrap_list(body: Value, candidate_keys: &[&str]) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut map) => {
            for key in candidate_keys {
                match map.remove(*key) {
                    Some(Value::Array(items)) => return Ok(items),
                    Some(Value::Null) => return Ok(Vec::new()),
                    Some(_) | None => continue,
                }
            }
            if map.is_empty() {
                return Ok(Vec::new());
            }
            let keys: Vec<&String> = map.keys().collect();
            Err(anyhow!("Unexpected response format with keys: {:?}", keys))
        }
        other => Err(anyhow!("Unexpected response format: {}", type_name(&other))),
    }
}

/// Page position reported under `meta.pagination`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn is_last(&self) -> bool {
        self.current_page >= self.total_pages
    }
}

/// Read pagination metadata; `requested_page` fills a missing `current_page`
/// and a missing `total_pages` means a single page.
pub fn pagination(body: &Value, requested_page: u64) -> Pagination {
    let meta = body.get("meta").and_then(|m| m.get("pagination"));
    let read = |key: &str| meta.and_then(|p| p.get(key)).and_then(as_u64);

    Pagination {
        current_page: read("current_page").unwrap_or(requested_page),
        total_pages: read("total_pages").unwrap_or(1),
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
