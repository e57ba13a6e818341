//! Centralized configuration for the flowkeys CLI
//!
//! This module provides a single source of truth for all configuration values
//! used throughout the application.
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override defaults:
//! - `FLOWKEYS_STORE`: Path of the account roster file
//! - `FLOWKEYS_ROUTER_HOME`: Directory holding the router's `config.json`
//! - `FLOWKEYS_API_URL`: Override the upstream platform base URL

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Default upstream platform base URL
pub const DEFAULT_API_BASE_URL: &str = "https://platform.iflow.cn";

/// Environment variable name for overriding the upstream URL
pub const API_URL_ENV_VAR: &str = "FLOWKEYS_API_URL";

/// Environment variable name for overriding the roster file path
pub const STORE_PATH_ENV_VAR: &str = "FLOWKEYS_STORE";

/// Environment variable name for overriding the router directory
pub const ROUTER_HOME_ENV_VAR: &str = "FLOWKEYS_ROUTER_HOME";

/// Timeout applied to every HTTP request, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Timeout applied to the router restart command, in seconds
pub const RESTART_TIMEOUT_SECS: u64 = 60;

/// Roster file name, stored next to the executable
pub const STORE_FILE_NAME: &str = "accounts.json";

/// Profile page path, relative to the upstream base URL
pub const PROFILE_PATH: &str = "/profile";

/// Key issuance endpoint path, relative to the upstream base URL
pub const KEY_ISSUANCE_PATH: &str = "/api/openapi/apikey";

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "BXAuth";

/// Hidden directory the router keeps under the user's home
pub const ROUTER_DIR_NAME: &str = ".claude-code-router";

/// Router configuration file name
pub const ROUTER_CONFIG_FILE: &str = "config.json";

/// Router plugin directory name
pub const PLUGINS_DIR_NAME: &str = "plugins";

/// Header transformer script name inside the plugin directory
pub const HEADER_SCRIPT_FILE: &str = "header.js";

/// Name of the provider entry this tool owns in the router config
pub const PROVIDER_NAME: &str = "op-provider";

/// Chat completions endpoint written into a newly created provider entry
pub const PROVIDER_BASE_URL: &str = "https://apis.iflow.cn/v1/chat/completions";

/// Models written into a newly created provider entry
pub const PROVIDER_MODELS: &[&str] = &[
    "qwen3-vl-plus",
    "minimax-m2.1",
    "kimi-k2.5",
    "glm-5",
    "minimax-m2.5",
];

/// Transformer the provider entry routes through
pub const PROVIDER_TRANSFORMER: &str = "header";

/// Shell command that restarts the router
pub const RESTART_COMMAND: &str = "ccr restart";

/// Remote header script template
pub const HEADER_SCRIPT_URL: &str = "https://raw.githubusercontent.com/715494637/iflow-manager/refs/heads/master/ccr%20config/plugins/header.js";

/// Remote router config template
pub const CONFIG_TEMPLATE_URL: &str =
    "https://raw.githubusercontent.com/715494637/iflow-manager/refs/heads/master/ccr%20config/config.json";

/// User name baked into the template's transformer paths
pub const TEMPLATE_USER_PLACEHOLDER: &str = "dypbi";

/// Key written into a provisioned config when the roster holds no keys
pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Settings resolved from CLI flags, environment, and defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Roster file path
    pub store_path: PathBuf,
    /// Explicit router directory; platform defaults apply when unset
    pub router_home: Option<PathBuf>,
    /// Upstream platform base URL, without trailing slash
    pub api_base_url: String,
}

impl Settings {
    /// Resolve settings, filling unset values with defaults
    pub fn resolve(
        store_path: Option<PathBuf>,
        router_home: Option<PathBuf>,
        api_base_url: Option<String>,
    ) -> Result<Self> {
        let store_path = match store_path {
            Some(path) => path,
            None => default_store_path()?,
        };
        let api_base_url = api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            store_path,
            router_home,
            api_base_url,
        })
    }

    /// Router directory used for syncing: the override, or `~/.claude-code-router`
    pub fn router_home(&self) -> Result<PathBuf> {
        if let Some(home) = &self.router_home {
            return Ok(home.clone());
        }
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(ROUTER_DIR_NAME))
    }

    /// Path of the router configuration file
    pub fn router_config_path(&self) -> Result<PathBuf> {
        Ok(self.router_home()?.join(ROUTER_CONFIG_FILE))
    }
}

/// Roster path next to the running executable
pub fn default_store_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Could not locate the running executable")?;
    let dir = exe
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok(dir.join(STORE_FILE_NAME))
}
