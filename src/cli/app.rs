use super::commands::tenant::TenantCommands;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roster-importer")]
#[command(version, about = "Validate job sheets against facilities reference data and import them as roster jobs")]
pub struct Cli {
    /// Tenant to use instead of the current one
    #[arg(short, long, global = true)]
    pub tenant: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage tenants (domain + API token)
    Tenant(TenantCommands),
    /// Fetch and summarize sites, floors, spaces and users
    Reference {
        /// Print the raw reference lists as JSON
        #[arg(long)]
        json: bool,
    },
    /// Audit a job sheet and export the run report
    Validate {
        #[command(flatten)]
        input: SheetArgs,
        /// Skip writing the run directory
        #[arg(long)]
        no_export: bool,
    },
    /// Show how each row's recurrence will be scheduled
    Preview {
        #[command(flatten)]
        input: SheetArgs,
    },
    /// Validate a job sheet, then create the ready rows as jobs
    Import {
        #[command(flatten)]
        input: SheetArgs,
        /// Print the payloads instead of sending them
        #[arg(long)]
        dry_run: bool,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SheetArgs {
    /// CSV or XLSX file with one job per row
    pub file: PathBuf,
    /// Worksheet name for XLSX input (default: first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
    /// Validate as if today were this date (YYYY-MM-DD)
    #[arg(long)]
    pub today: Option<NaiveDate>,
}
