use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs;
use std::path::Path;

use roster_importer::cli::commands::{
    import_command, preview_command, reference_command, tenant_command, validate_command,
};
use roster_importer::cli::{Cli, Commands};
use roster_importer::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    init_logging(&config.settings.log_dir)?;
    info!("Starting roster-importer {}", env!("CARGO_PKG_VERSION"));

    let tenant = cli.tenant.as_deref();
    match cli.command {
        Commands::Tenant(cmd) => tenant_command(cmd, &mut config, tenant).await,
        Commands::Reference { json } => reference_command(&config, tenant, json).await,
        Commands::Validate { input, no_export } => validate_command(&config, tenant, input, no_export).await,
        Commands::Preview { input } => preview_command(input),
        Commands::Import { input, dry_run, yes } => import_command(&config, tenant, input, dry_run, yes).await,
    }
}

/// Log to a fresh timestamped file; `RUST_LOG` overrides the default level
fn init_logging(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let file_name = format!("roster-importer-{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let log_file = fs::File::create(log_dir.join(&file_name))
        .with_context(|| format!("Failed to create log file {}", file_name))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}
