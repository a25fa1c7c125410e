use anyhow::{Context, Result};
use chrono_tz::Tz;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::jobs::dates::parse_timezone;

pub const ENV_DOMAIN: &str = "FA_DOMAIN";
pub const ENV_TOKEN: &str = "FA_TOKEN";
/// Name reported for the tenant built from environment variables
pub const ENV_TENANT_NAME: &str = "env";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Host name of the facilities instance, without scheme
    pub domain: String,
    pub token: String,
}

impl TenantConfig {
    pub fn new(domain: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            domain: normalize_domain(&domain.into()),
            token: token.into().trim().to_string(),
        }
    }
}

/// Strip scheme and trailing slashes so `https://x.example.com/` becomes `x.example.com`
pub fn normalize_domain(domain: &str) -> String {
    domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    pub current_tenant: Option<String>,
    #[serde(default)]
    pub tenants: HashMap<String, TenantConfig>,
    #[serde(default)]
    pub settings: Settings,
    /// Where this config was loaded from; `None` means the default location
    #[serde(skip)]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_low_quota_threshold")]
    pub low_quota_threshold: u32,
    #[serde(default = "default_low_quota_pause_ms")]
    pub low_quota_pause_ms: u64,
    #[serde(default = "default_users_page_size")]
    pub users_page_size: u32,
    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_request_logging")]
    pub request_logging: bool,
}

fn default_timezone() -> String {
    "Europe/London".to_string()
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_failure_threshold() -> f64 {
    0.1
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_low_quota_threshold() -> u32 {
    5
}

fn default_low_quota_pause_ms() -> u64 {
    2000
}

fn default_users_page_size() -> u32 {
    200
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from("runs")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_request_logging() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            request_delay_ms: default_request_delay_ms(),
            failure_threshold: default_failure_threshold(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            low_quota_threshold: default_low_quota_threshold(),
            low_quota_pause_ms: default_low_quota_pause_ms(),
            users_page_size: default_users_page_size(),
            runs_dir: default_runs_dir(),
            log_dir: default_log_dir(),
            request_logging: default_request_logging(),
        }
    }
}

impl Settings {
    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone).context("Invalid 'timezone' setting")
    }
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("roster-importer")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".roster-importer")
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
            info!("Created config directory: {:?}", config_dir);
        }

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.path = None;
        Ok(config)
    }

    /// Load from an explicit file; a missing file yields defaults bound to that path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", config_path);

        if !config_path.exists() {
            info!("Config file doesn't exist, using default config");
            return Ok(Self {
                path: Some(config_path.to_path_buf()),
                ..Self::default()
            });
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let mut config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
        config.path = Some(config_path.to_path_buf());

        debug!("Loaded config with {} tenants", config.tenants.len());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = match &self.path {
            Some(path) => path.clone(),
            None => Self::get_config_path()?,
        };
        debug!("Saving config to: {:?}", config_path);

        let config_content =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, config_content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Config saved successfully");
        Ok(())
    }

    pub fn add_tenant(&mut self, name: String, tenant: TenantConfig) -> Result<()> {
        info!("Adding tenant: {} ({})", name, tenant.domain);
        self.tenants.insert(name.clone(), tenant);

        // First tenant becomes the current one
        if self.current_tenant.is_none() {
            self.current_tenant = Some(name.clone());
            info!("Set {} as current tenant", name);
        }

        self.save()
    }

    pub fn get_current_tenant(&self) -> Option<&TenantConfig> {
        let current = self.current_tenant.as_ref()?;
        self.tenants.get(current)
    }

    pub fn set_current_tenant(&mut self, name: String) -> Result<()> {
        if !self.tenants.contains_key(&name) {
            anyhow::bail!("Tenant '{}' not found", name);
        }

        info!("Setting current tenant to: {}", name);
        self.current_tenant = Some(name);
        self.save()
    }

    /// Tenant names, sorted
    pub fn list_tenants(&self) -> Vec<&String> {
        let mut names: Vec<&String> = self.tenants.keys().collect();
        names.sort();
        names
    }

    pub fn remove_tenant(&mut self, name: &str) -> Result<()> {
        if self.tenants.remove(name).is_none() {
            anyhow::bail!("Tenant '{}' not found", name);
        }
        info!("Removing tenant: {}", name);

        if self.current_tenant.as_deref() == Some(name) {
            warn!("Removed current tenant, clearing current selection");
            self.current_tenant = None;
        }

        self.save()
    }

    /// Pick the tenant to talk to.
    ///
    /// An explicitly named tenant wins, then an environment tenant, then the
    /// current selection. Having none of them is a fatal configuration error.
    pub fn resolve_tenant(&self, name: Option<&str>, env: Option<TenantConfig>) -> Result<(String, TenantConfig)> {
        if let Some(name) = name {
            let tenant = self
                .tenants
                .get(name)
                .with_context(|| format!("Tenant '{}' not found", name))?;
            return Ok((name.to_string(), tenant.clone()));
        }

        if let Some(tenant) = env {
            debug!("Using tenant from {} / {}", ENV_DOMAIN, ENV_TOKEN);
            return Ok((ENV_TENANT_NAME.to_string(), tenant));
        }

        match (&self.current_tenant, self.get_current_tenant()) {
            (Some(name), Some(tenant)) => Ok((name.clone(), tenant.clone())),
            _ => anyhow::bail!(
                "No tenant configured. Run 'roster-importer tenant add' or set {} and {}",
                ENV_DOMAIN,
                ENV_TOKEN
            ),
        }
    }
}

/// Tenant from `FA_DOMAIN` / `FA_TOKEN`, only when both are set and non-blank
pub fn tenant_from_env() -> Option<TenantConfig> {
    let domain = std::env::var(ENV_DOMAIN).ok().filter(|v| !v.trim().is_empty())?;
    let token = std::env::var(ENV_TOKEN).ok().filter(|v| !v.trim().is_empty())?;
    Some(TenantConfig::new(domain, token))
}
