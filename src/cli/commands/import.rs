use anyhow::Result;
use chrono::Utc;
use colored::*;
use log::{info, warn};

use super::{active_tenant, build_client, prepare_session};
use super::validate::{print_issues, print_summary};
use crate::cli::app::SheetArgs;
use crate::config::Config;
use crate::import::{AbortReason, CancellationFlag, ImportOutcome, ImportRunner, RowEvent, RunDirectory};
use crate::jobs::build_row_payload;
use crate::session::ImportSession;
use crate::ui::prompts;

pub async fn import_command(
    config: &Config,
    tenant: Option<&str>,
    input: SheetArgs,
    dry_run: bool,
    yes: bool,
) -> Result<()> {
    let (_, tenant) = active_tenant(config, tenant)?;
    let client = build_client(config, tenant)?;
    let session = prepare_session(config, &client, &input).await?;

    print_issues(&session);
    print_summary(&session);

    let ready = session.ready_rows();
    if ready.is_empty() {
        println!("  {}", "No rows are ready to import".bright_yellow().bold());
        return Ok(());
    }

    if dry_run {
        return print_payloads(&session);
    }

    if !yes && !prompts::prompt_import_confirmation(ready.len(), client.domain())? {
        println!("  {}", "Cancelled".dimmed());
        return Ok(());
    }

    let run = RunDirectory::create(&config.settings.runs_dir, Utc::now().with_timezone(&session.timezone()))?;
    run.export_validation(&session, client.domain())?;

    let cancel = CancellationFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current row");
            signal_flag.cancel();
        }
    });

    let Some(resolver) = session.resolver() else {
        anyhow::bail!("No reference data loaded");
    };
    let runner = ImportRunner::new(&client, resolver, config.settings.failure_threshold).with_cancellation(cancel);

    let outcome = runner
        .run_with(&ready, |event| match event {
            RowEvent::Created { index, total, row } => println!(
                "  [{}/{}] {} row {} → job {}",
                index + 1,
                total,
                "✓".bright_green().bold(),
                row.csv_row,
                row.job_id.bright_green()
            ),
            RowEvent::Failed { index, total, row } => println!(
                "  [{}/{}] {} row {}: {}",
                index + 1,
                total,
                "✗".bright_red().bold(),
                row.csv_row,
                row.error.bright_red()
            ),
        })
        .await;

    run.write_import_results(&outcome)?;
    let pacing = client.rate_limiter().stats();
    info!(
        "Rate limiter: {} requests, {} waits, {} quota pauses",
        pacing.requests_made, pacing.waits, pacing.quota_pauses
    );
    print_outcome(&outcome);
    println!("  Results saved to {}", run.path().display());

    match outcome.aborted {
        Some(reason @ AbortReason::FailureRate { .. }) => anyhow::bail!("Import aborted: {}", reason),
        _ => Ok(()),
    }
}

fn print_payloads(session: &ImportSession) -> Result<()> {
    let Some(resolver) = session.resolver() else {
        anyhow::bail!("No reference data loaded");
    };

    for row in session.ready_rows() {
        println!("{}", format!("# row {}: {}", row.row_number, row.title()).bright_white().bold());
        match build_row_payload(row, &resolver) {
            Ok(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
            Err(e) => println!("  {} {}", "✗".bright_red().bold(), e),
        }
    }
    Ok(())
}

fn print_outcome(outcome: &ImportOutcome) {
    println!();
    println!(
        "  {} successful, {} failed",
        outcome.created.len().to_string().bright_green().bold(),
        outcome.failures.len().to_string().bright_red().bold()
    );
    if let Some(reason) = outcome.aborted {
        println!(
            "  {} aborted ({}), {} row(s) not attempted",
            "⚠".bright_yellow().bold(),
            reason,
            outcome.skipped
        );
    }
    println!();
}
