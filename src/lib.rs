//! Validate CSV/XLSX job sheets against a facilities tenant's reference data
//! and create the valid rows as roster jobs.

pub mod api;
pub mod cli;
pub mod config;
pub mod import;
pub mod jobs;
pub mod reference;
pub mod session;
pub mod ui;

pub use api::FacilityClient;
pub use config::{Config, Settings, TenantConfig};
pub use import::{ImportRunner, JobSubmitter};
pub use session::ImportSession;
