pub mod import;
pub mod preview;
pub mod reference;
pub mod tenant;
pub mod validate;

use anyhow::{Context, Result};
use colored::*;
use log::info;

use crate::api::{FacilityClient, ResilienceConfig};
use crate::config::{Config, TenantConfig, tenant_from_env};
use crate::jobs::{IssueStatus, load_rows};
use crate::session::ImportSession;

use super::app::SheetArgs;

pub use import::import_command;
pub use preview::preview_command;
pub use reference::reference_command;
pub use tenant::{TenantCommands, tenant_command};
pub use validate::validate_command;

/// Tenant selected by `--tenant`, the environment or the config, in that order
pub(crate) fn active_tenant(config: &Config, tenant: Option<&str>) -> Result<(String, TenantConfig)> {
    config.resolve_tenant(tenant, tenant_from_env())
}

pub(crate) fn build_client(config: &Config, tenant: TenantConfig) -> Result<FacilityClient> {
    FacilityClient::new(
        tenant,
        ResilienceConfig::from_settings(&config.settings),
        config.settings.users_page_size,
    )
}

/// Fetch reference data, load the sheet and validate it
pub(crate) async fn prepare_session(
    config: &Config,
    client: &FacilityClient,
    input: &SheetArgs,
) -> Result<ImportSession> {
    let mut session = ImportSession::new(config.settings.tz()?);
    if let Some(today) = input.today {
        session = session.with_today(today);
    }

    println!("  {} Fetching reference data from {}", "→".cyan(), client.domain().cyan());
    let reference = client.fetch_reference_data().await?;
    let diagnostics = session.load_reference(reference).diagnostics();
    if diagnostics.total_dropped() > 0 {
        println!(
            "  {} {} reference record(s) without an id were ignored",
            "⚠".bright_yellow(),
            diagnostics.total_dropped()
        );
    }

    let sheet = load_rows(&input.file, input.sheet.as_deref())
        .with_context(|| format!("Failed to load {}", input.file.display()))?;
    println!("  {} Loaded {} row(s) from {}", "→".cyan(), sheet.len(), input.file.display());
    session.load_rows(sheet);

    session.validate()?;
    info!("Validation summary: {:?}", session.summary());
    Ok(session)
}

pub(crate) fn status_label(status: IssueStatus) -> ColoredString {
    match status {
        IssueStatus::Ok => status.as_str().bright_green().bold(),
        IssueStatus::Warn => status.as_str().bright_yellow().bold(),
        IssueStatus::Error => status.as_str().bright_red().bold(),
    }
}
