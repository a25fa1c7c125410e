//! Facilities API: client, endpoints, response normalization and resilience

pub mod client;
pub mod constants;
pub mod models;
pub mod resilience;
pub mod response;

pub use client::FacilityClient;
pub use models::{CreatedJob, SubmitError};
pub use resilience::{ResilienceConfig, RetryConfig, RetryPolicy, RetryableError};
pub use response::{Pagination, pagination, unwrap_list};
