use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;

use super::{active_tenant, build_client};
use crate::api::resilience::redact_token;
use crate::config::Config;
use crate::ui::prompts;

#[derive(Args)]
pub struct TenantCommands {
    #[command(subcommand)]
    pub command: TenantSubcommands,
}

#[derive(Subcommand)]
pub enum TenantSubcommands {
    /// Add or replace a tenant
    Add {
        /// Name for this tenant
        name: Option<String>,
        /// Facilities domain, with or without https://
        #[arg(long)]
        domain: Option<String>,
        /// API bearer token (prompted when omitted)
        #[arg(long)]
        token: Option<String>,
        /// Make it the current tenant
        #[arg(long)]
        select: bool,
        /// Overwrite without asking
        #[arg(short, long)]
        force: bool,
    },
    /// List configured tenants
    List,
    /// Choose the current tenant
    Select {
        name: Option<String>,
    },
    /// Remove a tenant
    Remove {
        name: String,
        #[arg(short, long)]
        force: bool,
    },
    /// Check that the API accepts the tenant's token
    Test,
}

pub async fn tenant_command(cmd: TenantCommands, config: &mut Config, tenant: Option<&str>) -> Result<()> {
    match cmd.command {
        TenantSubcommands::Add {
            name,
            domain,
            token,
            select,
            force,
        } => add_tenant(config, name, domain, token, select, force),
        TenantSubcommands::List => {
            list_tenants(config);
            Ok(())
        }
        TenantSubcommands::Select { name } => select_tenant(config, name),
        TenantSubcommands::Remove { name, force } => remove_tenant(config, &name, force),
        TenantSubcommands::Test => test_tenant(config, tenant).await,
    }
}

fn add_tenant(
    config: &mut Config,
    name: Option<String>,
    domain: Option<String>,
    token: Option<String>,
    select: bool,
    force: bool,
) -> Result<()> {
    let name = prompts::prompt_tenant_name(name)?;
    if name.is_empty() {
        anyhow::bail!("Tenant name cannot be empty");
    }

    if config.tenants.contains_key(&name) && !force && !prompts::prompt_overwrite_confirmation(&name)? {
        println!("  {}", "Cancelled".dimmed());
        return Ok(());
    }

    let tenant = prompts::prompt_tenant(domain, token)?;
    if tenant.domain.is_empty() || tenant.token.is_empty() {
        anyhow::bail!("Both a domain and a token are required");
    }

    let first = config.tenants.is_empty();
    config.add_tenant(name.clone(), tenant)?;
    if select || first {
        config.set_current_tenant(name.clone())?;
    }
    config.save()?;

    println!("{} Tenant '{}' saved", "✓".bright_green().bold(), name.bright_green().bold());
    if config.current_tenant.as_deref() == Some(name.as_str()) {
        println!("{} '{}' is the current tenant", "✓".bright_green().bold(), name.bright_green().bold());
    }
    Ok(())
}

fn list_tenants(config: &Config) {
    let names = config.list_tenants();
    if names.is_empty() {
        println!("  {}", "No tenants configured".bright_yellow().bold());
        println!("  {}", "Add one with 'roster-importer tenant add'.".dimmed());
        return;
    }

    println!();
    println!("  {}", "Configured tenants:".bright_white().bold());
    for name in names {
        let Some(tenant) = config.tenants.get(name) else {
            continue;
        };
        let current = config.current_tenant.as_ref() == Some(name);
        let (marker, label) = if current {
            ("●", name.bright_green().bold())
        } else {
            ("○", name.white())
        };
        println!(
            "  {} {} → {} (token {}){}",
            marker.bright_green(),
            label,
            tenant.domain.cyan(),
            redact_token(&tenant.token).dimmed(),
            if current { " (current)".bright_green() } else { "".white() }
        );
    }
    println!();
}

fn select_tenant(config: &mut Config, name: Option<String>) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => {
            let names = config.list_tenants();
            match prompts::prompt_select_tenant(&names, config.current_tenant.as_deref())? {
                Some(name) => name,
                None => {
                    println!("  {}", "No tenants configured".bright_yellow().bold());
                    return Ok(());
                }
            }
        }
    };

    config.set_current_tenant(name.clone())?;
    config.save()?;
    println!("{} Current tenant: {}", "✓".bright_green().bold(), name.bright_green().bold());
    Ok(())
}

fn remove_tenant(config: &mut Config, name: &str, force: bool) -> Result<()> {
    if !config.tenants.contains_key(name) {
        anyhow::bail!("Tenant '{}' not found", name);
    }
    if !force && !prompts::prompt_remove_confirmation(name)? {
        println!("  {}", "Cancelled".dimmed());
        return Ok(());
    }

    config.remove_tenant(name)?;
    config.save()?;
    println!("{} Tenant '{}' removed", "✓".bright_green().bold(), name);
    Ok(())
}

async fn test_tenant(config: &Config, tenant: Option<&str>) -> Result<()> {
    let (name, tenant) = active_tenant(config, tenant)?;
    let client = build_client(config, tenant)?;

    println!("  {} Testing '{}' ({})", "→".cyan(), name, client.domain().cyan());
    match client.test_connection().await {
        Ok(()) => {
            println!("{} Connection OK", "✓".bright_green().bold());
            Ok(())
        }
        Err(e) => {
            println!("{} Connection failed", "✗".bright_red().bold());
            Err(e)
        }
    }
}
