//! Runtime configuration.
//!
//! Configuration is stored at `~/.config/sessiongate/config.json` and every
//! field can be overridden from the environment (`SESSIONGATE_*`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "sessiongate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_API_BASE: &str = "SESSIONGATE_API_BASE";
const ENV_API_BASE_SERVER: &str = "SESSIONGATE_API_BASE_SERVER";
const ENV_LANDING_ROUTE: &str = "SESSIONGATE_LANDING_ROUTE";
const ENV_PROTECTED_ROUTES: &str = "SESSIONGATE_PROTECTED_ROUTES";
const ENV_REQUEST_TIMEOUT: &str = "SESSIONGATE_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API base URL used on the client context (the browser-facing proxy)
    pub api_base: String,
    /// API base URL used on the server-rendering context (the API origin itself)
    pub api_base_server: String,
    /// Public route that failed renewals redirect to
    pub landing_route: String,
    /// Path prefixes that require a credential
    pub protected_routes: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3000/api".to_string(),
            api_base_server: "http://localhost:8080".to_string(),
            landing_route: "/".to_string(),
            protected_routes: vec!["/admin".to_string()],
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load the config file (defaults when missing), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from a key lookup (the process environment in [`Config::load`]).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup(ENV_API_BASE) {
            self.api_base = base;
        }
        if let Some(base) = lookup(ENV_API_BASE_SERVER) {
            self.api_base_server = base;
        }
        if let Some(route) = lookup(ENV_LANDING_ROUTE) {
            self.landing_route = route;
        }
        if let Some(routes) = lookup(ENV_PROTECTED_ROUTES) {
            self.protected_routes = routes
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", ENV_REQUEST_TIMEOUT))?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
