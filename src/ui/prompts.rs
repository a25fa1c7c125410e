use anyhow::Result;
use dialoguer::{Confirm, Input, Password, Select};

use crate::config::TenantConfig;

pub fn prompt_tenant_name(default_name: Option<String>) -> Result<String> {
    if let Some(name) = default_name {
        return Ok(name);
    }
    let name = Input::<String>::new()
        .with_prompt("Tenant name (e.g. 'acme', 'staging')")
        .interact_text()?;
    Ok(name.trim().to_string())
}

/// Domain and token, asking only for what was not given on the command line
pub fn prompt_tenant(domain: Option<String>, token: Option<String>) -> Result<TenantConfig> {
    let domain = match domain {
        Some(domain) => domain,
        None => Input::<String>::new()
            .with_prompt("Facilities domain (e.g. acme.facilities.example.com)")
            .interact_text()?,
    };

    let token = match token {
        Some(token) => token,
        None => Password::new().with_prompt("API bearer token").interact()?,
    };

    Ok(TenantConfig::new(domain, token))
}

pub fn prompt_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(default_yes)
        .interact()?)
}

pub fn prompt_overwrite_confirmation(name: &str) -> Result<bool> {
    prompt_confirmation(&format!("Tenant '{}' already exists. Overwrite?", name), false)
}

pub fn prompt_remove_confirmation(name: &str) -> Result<bool> {
    prompt_confirmation(&format!("Remove tenant '{}'?", name), false)
}

pub fn prompt_import_confirmation(ready: usize, domain: &str) -> Result<bool> {
    prompt_confirmation(&format!("Create {} job(s) on {}?", ready, domain), false)
}

/// Arrow-key selection among tenant names; `None` when there are none
pub fn prompt_select_tenant(names: &[&String], current: Option<&str>) -> Result<Option<String>> {
    if names.is_empty() {
        return Ok(None);
    }
    let default = names
        .iter()
        .position(|n| Some(n.as_str()) == current)
        .unwrap_or(0);

    let selection = Select::new()
        .with_prompt("Select tenant")
        .items(names)
        .default(default)
        .interact()?;
    Ok(Some(names[selection].clone()))
}
