use anyhow::Result;
use chrono::Utc;
use colored::*;

use super::{active_tenant, build_client, prepare_session, status_label};
use crate::cli::app::SheetArgs;
use crate::config::Config;
use crate::import::RunDirectory;
use crate::jobs::IssueStatus;
use crate::session::ImportSession;

pub async fn validate_command(config: &Config, tenant: Option<&str>, input: SheetArgs, no_export: bool) -> Result<()> {
    let (_, tenant) = active_tenant(config, tenant)?;
    let client = build_client(config, tenant)?;
    let session = prepare_session(config, &client, &input).await?;

    print_issues(&session);
    print_summary(&session);

    if !no_export {
        let run = RunDirectory::create(&config.settings.runs_dir, Utc::now().with_timezone(&session.timezone()))?;
        run.export_validation(&session, client.domain())?;
        println!("  {} Report written to {}", "✓".bright_green().bold(), run.path().display());
    }
    Ok(())
}

/// Every WARN and ERROR issue, one line each
pub(crate) fn print_issues(session: &ImportSession) {
    let mut any = false;
    for issue in session.issues().filter(|i| i.status != IssueStatus::Ok) {
        if !any {
            println!();
            any = true;
        }
        println!(
            "  row {:>4}  {:<5}  {:<24} {}",
            issue.row_number,
            status_label(issue.status),
            issue.code.as_str(),
            issue.detail
        );
        if !issue.suggestion.is_empty() {
            println!("             {}", issue.suggestion.dimmed());
        }
    }
}

pub(crate) fn print_summary(session: &ImportSession) {
    let summary = session.summary();
    println!();
    println!(
        "  {} rows: {} ready, {} with errors, {} with warnings only",
        summary.total_rows.to_string().bright_white().bold(),
        summary.ready_rows.to_string().bright_green().bold(),
        summary.error_rows.to_string().bright_red().bold(),
        summary.warn_rows.to_string().bright_yellow().bold()
    );
    println!(
        "  {} error(s), {} warning(s)",
        summary.error_issues,
        summary.warn_issues
    );
    println!();
}
