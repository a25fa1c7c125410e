//! Endpoints and fixed values of the facilities API

/// Sites (single page)
pub const SITES_ENDPOINT: &str = "/api/v1/planning/sites";

/// Floors (single page)
pub const FLOORS_ENDPOINT: &str = "/api/v1/planning/floors";

/// Spaces (single page)
pub const SPACES_ENDPOINT: &str = "/api/v1/planning/spaces";

/// Users, paginated with `page` and `limit`
pub const USERS_ENDPOINT: &str = "/api/v1/user";

/// Roster job create/save
pub const JOB_SAVE_ENDPOINT: &str = "/api/1.0/planning/save/true";

/// Wrapper keys under which list endpoints may nest their records
pub const LIST_WRAPPER_KEYS: &[&str] = &["data", "sites", "floors", "spaces", "users"];

/// Error bodies are cut to this many characters before being stored
pub const MAX_ERROR_BODY: usize = 500;

pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Remaining request quota reported by the API
    pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
}

pub mod timeouts {
    use std::time::Duration;

    pub const REQUEST: Duration = Duration::from_secs(30);
    pub const CONNECTION_TEST: Duration = Duration::from_secs(10);
    pub const CONNECT: Duration = Duration::from_secs(10);
}

pub fn base_url(domain: &str) -> String {
    format!("https://{}", domain)
}
