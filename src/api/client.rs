use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::constants::{
    FLOORS_ENDPOINT, JOB_SAVE_ENDPOINT, LIST_WRAPPER_KEYS, SITES_ENDPOINT, SPACES_ENDPOINT,
    USERS_ENDPOINT, base_url, headers, timeouts,
};
use super::models::{CreatedJob, SubmitError};
use super::resilience::{ApiLogger, RateLimiter, RequestContext, ResilienceConfig, RetryPolicy, redact_token};
use super::response::{pagination, unwrap_list};
use crate::config::TenantConfig;
use crate::import::JobSubmitter;
use crate::jobs::JobPayload;
use crate::reference::ReferenceData;

/// Client for one facilities tenant
pub struct FacilityClient {
    http_client: reqwest::Client,
    tenant: TenantConfig,
    base_url: String,
    rate_limiter: RateLimiter,
    retry_policy: RetryPolicy,
    logger: ApiLogger,
    users_page_size: u32,
}

impl FacilityClient {
    pub fn new(tenant: TenantConfig, resilience: ResilienceConfig, users_page_size: u32) -> Result<Self> {
        if tenant.token.trim().is_empty() {
            bail!("No API token configured for domain '{}'", tenant.domain);
        }

        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .timeout(timeouts::REQUEST)
            .connect_timeout(timeouts::CONNECT)
            .user_agent(concat!("roster-importer/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        info!(
            "Client for {} (token {})",
            tenant.domain,
            redact_token(&tenant.token)
        );

        Ok(Self {
            http_client,
            base_url: base_url(&tenant.domain),
            tenant,
            rate_limiter: RateLimiter::new(resilience.rate_limit),
            retry_policy: RetryPolicy::new(resilience.retry),
            logger: ApiLogger::new(resilience.monitoring),
            users_page_size: users_page_size.max(1),
        })
    }

    pub fn domain(&self) -> &str {
        &self.tenant.domain
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn log_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("Authorization".to_string(), format!("Bearer {}", self.tenant.token)),
            ("Content-Type".to_string(), headers::CONTENT_TYPE_JSON.to_string()),
        ])
    }

    /// GET the sites endpoint with a short timeout; Ok means the token is accepted
    pub async fn test_connection(&self) -> Result<()> {
        let response = self
            .http_client
            .get(self.url(SITES_ENDPOINT))
            .bearer_auth(&self.tenant.token)
            .timeout(timeouts::CONNECTION_TEST)
            .send()
            .await
            .with_context(|| format!("Could not reach {}", self.tenant.domain))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(anyhow!(SubmitError::http(status.as_u16(), &body)))
                .with_context(|| format!("Connection test against {} failed", self.tenant.domain))
        }
    }

    async fn get_json(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        let ctx = RequestContext::new(endpoint, None);
        let url = self.url(endpoint);
        self.logger.log_request(&ctx, "GET", &url, &self.log_headers());

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.tenant.token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {} failed", endpoint))?;

        let status = response.status();
        self.logger.log_response(&ctx, status.as_u16(), remaining_quota(&response));

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            bail!(
                "Authentication failed ({}) for {}. Check the API token.",
                status.as_u16(),
                self.tenant.domain
            );
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(SubmitError::http(status.as_u16(), &body)))
                .with_context(|| format!("GET {} failed", endpoint));
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("Invalid JSON from {}", endpoint))
    }

    async fn get_list(&self, endpoint: &str) -> Result<Vec<Value>> {
        let body = self.get_json(endpoint, &[]).await?;
        unwrap_list(body, LIST_WRAPPER_KEYS).with_context(|| format!("Reading {}", endpoint))
    }

    pub async fn get_sites(&self) -> Result<Vec<Value>> {
        self.get_list(SITES_ENDPOINT).await
    }

    pub async fn get_floors(&self) -> Result<Vec<Value>> {
        self.get_list(FLOORS_ENDPOINT).await
    }

    pub async fn get_spaces(&self) -> Result<Vec<Value>> {
        self.get_list(SPACES_ENDPOINT).await
    }

    /// All users, following `meta.pagination` until the last page
    pub async fn get_users(&self) -> Result<Vec<Value>> {
        let mut users = Vec::new();
        let mut page: u64 = 1;

        loop {
            let query = [("page", page.to_string()), ("limit", self.users_page_size.to_string())];
            let body = self.get_json(USERS_ENDPOINT, &query).await?;
            let position = pagination(&body, page);
            let batch = unwrap_list(body, LIST_WRAPPER_KEYS)
                .with_context(|| format!("Reading users page {}", page))?;

            debug!("Users page {}/{}: {} records", position.current_page, position.total_pages, batch.len());
            let empty = batch.is_empty();
            users.extend(batch);

            if position.is_last() || empty {
                break;
            }
            page = position.current_page + 1;
        }

        Ok(users)
    }

    /// Fetch every reference list; any failure aborts the whole fetch
    pub async fn fetch_reference_data(&self) -> Result<ReferenceData> {
        let sites = self.get_sites().await.context("Fetching sites")?;
        let floors = self.get_floors().await.context("Fetching floors")?;
        let spaces = self.get_spaces().await.context("Fetching spaces")?;
        let users = self.get_users().await.context("Fetching users")?;

        info!(
            "Reference data: {} sites, {} floors, {} spaces, {} users",
            sites.len(),
            floors.len(),
            spaces.len(),
            users.len()
        );

        Ok(ReferenceData {
            sites,
            floors,
            spaces,
            users,
        })
    }

    /// One POST of a job payload, no retry
    pub async fn create_job(&self, row_number: usize, payload: &JobPayload) -> Result<CreatedJob, SubmitError> {
        let ctx = RequestContext::new("create_job", Some(row_number));
        let url = self.url(JOB_SAVE_ENDPOINT);
        self.logger.log_request(&ctx, "POST", &url, &self.log_headers());
        debug!("Payload for row {}: {}", row_number, serde_json::to_string(payload).unwrap_or_default());

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.tenant.token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let remaining = remaining_quota(&response);
        self.logger.log_response(&ctx, status.as_u16(), remaining);
        self.rate_limiter.note_remaining(remaining).await;

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let body: Value = response
                .json()
                .await
                .map_err(|e| SubmitError::Decode(e.to_string()))?;
            CreatedJob::from_response(&body)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SubmitError::http(status.as_u16(), &body))
        }
    }

    /// Paced submission with retry on server errors
    pub async fn create_job_with_retry(&self, row_number: usize, payload: &JobPayload) -> Result<CreatedJob, SubmitError> {
        self.rate_limiter.acquire().await;

        let ctx = RequestContext::new("create_job", Some(row_number));
        let ctx_ref = &ctx;
        let attempts = Arc::new(AtomicU32::new(0));

        let result = self
            .retry_policy
            .execute(|| {
                let attempts = attempts.clone();
                async move {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let outcome = self.create_job(row_number, payload).await;
                    if let Err(error) = &outcome {
                        if error.retry_class().should_retry() && attempt < self.retry_policy.config().max_attempts {
                            self.logger.log_retry(ctx_ref, attempt, &error.to_string(), self.retry_policy.calculate_delay(attempt));
                        }
                    }
                    outcome
                }
            })
            .await;

        let attempts = attempts.load(Ordering::SeqCst);
        match &result {
            Ok(created) => self.logger.log_complete(&ctx, attempts, Ok(&created.id)),
            Err(error) => self.logger.log_complete(&ctx, attempts, Err(&error.to_string())),
        }
        result
    }
}

#[async_trait]
impl JobSubmitter for FacilityClient {
    async fn submit(&self, row_number: usize, payload: &JobPayload) -> Result<CreatedJob, SubmitError> {
        self.create_job_with_retry(row_number, payload).await
    }
}

fn remaining_quota(response: &reqwest::Response) -> Option<u32> {
    response
        .headers()
        .get(headers::RATE_LIMIT_REMAINING)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_remaining)
}

fn parse_remaining(value: &str) -> Option<u32> {
    value.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantConfig {
        TenantConfig::new("https://acme.example.com/", "abcd1234efgh5678")
    }

    #[test]
    fn test_client_builds_urls_from_domain() {
        let client = FacilityClient::new(tenant(), ResilienceConfig::disabled(), 200).unwrap();
        assert_eq!(client.domain(), "acme.example.com");
        assert_eq!(client.url(SITES_ENDPOINT), "https://acme.example.com/api/v1/planning/sites");
        assert_eq!(
            client.url(JOB_SAVE_ENDPOINT),
            "https://acme.example.com/api/1.0/planning/save/true"
        );
    }

    #[test]
    fn test_empty_token_rejected() {
        let result = FacilityClient::new(
            TenantConfig::new("acme.example.com", " "),
            ResilienceConfig::default(),
            200,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_page_size_at_least_one() {
        let client = FacilityClient::new(tenant(), ResilienceConfig::disabled(), 0).unwrap();
        assert_eq!(client.users_page_size, 1);
    }

    #[test]
    fn test_parse_remaining() {
        assert_eq!(parse_remaining("4"), Some(4));
        assert_eq!(parse_remaining(" 120 "), Some(120));
        assert_eq!(parse_remaining("n/a"), None);
    }
}
