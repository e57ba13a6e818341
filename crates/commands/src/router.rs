//! Router configuration sync
//!
//! The router owns its `config.json`; this module only touches the provider
//! entry named [`PROVIDER_NAME`] and the `path` of template transformers.
//! The document is edited as a JSON value so every other field, including
//! ones of unexpected shape, is written back unchanged and in order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use flowkeys_runtime::config::{
    PROVIDER_BASE_URL, PROVIDER_MODELS, PROVIDER_NAME, PROVIDER_TRANSFORMER, RESTART_COMMAND,
    RESTART_TIMEOUT_SECS,
};
use flowkeys_runtime::deps::{CommandExecutor, CommandTimedOut, FileSystem};

use crate::store::Roster;

const PROVIDERS_KEY: &str = "Providers";
const TRANSFORMERS_KEY: &str = "transformers";

/// The entry appended when the router config has none of ours
pub fn managed_provider(api_keys: &str) -> Value {
    json!({
        "name": PROVIDER_NAME,
        "api_base_url": PROVIDER_BASE_URL,
        "api_key": api_keys,
        "models": PROVIDER_MODELS,
        "transformer": { "use": [PROVIDER_TRANSFORMER] },
    })
}

/// What happened to the managed provider entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderChange {
    /// An existing entry got new keys
    Updated,
    /// A new entry was appended
    Appended,
}

/// The router's `config.json`, kept as the untyped document it was read as
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouterConfig(Map<String, Value>);

impl RouterConfig {
    /// Parse a router config document; the top level must be an object
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Serialize with two-space indentation
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// The whole document
    pub const fn document(&self) -> &Map<String, Value> {
        &self.0
    }

    fn managed_provider_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0
            .get_mut(PROVIDERS_KEY)?
            .as_array_mut()?
            .iter_mut()
            .filter_map(Value::as_object_mut)
            .find(|provider| provider.get("name").and_then(Value::as_str) == Some(PROVIDER_NAME))
    }

    /// Overwrite the managed entry's keys, if the entry exists
    pub fn update_provider_key(&mut self, api_keys: &str) -> bool {
        match self.managed_provider_mut() {
            Some(provider) => {
                provider.insert("api_key".to_string(), Value::from(api_keys));
                true
            }
            None => false,
        }
    }

    /// Overwrite the managed entry's keys, appending the entry when missing.
    /// Returns `None` when `Providers` exists but is not a list.
    pub fn upsert_provider_key(&mut self, api_keys: &str) -> Option<ProviderChange> {
        if self.update_provider_key(api_keys) {
            return Some(ProviderChange::Updated);
        }
        self.0
            .entry(PROVIDERS_KEY)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()?
            .push(managed_provider(api_keys));
        Some(ProviderChange::Appended)
    }

    /// Replace `placeholder` with `user` in every string transformer path.
    /// Returns the number of paths patched.
    pub fn patch_transformer_paths(&mut self, placeholder: &str, user: &str) -> usize {
        let Some(transformers) = self
            .0
            .get_mut(TRANSFORMERS_KEY)
            .and_then(Value::as_array_mut)
        else {
            return 0;
        };

        let mut patched = 0;
        for path in transformers
            .iter_mut()
            .filter_map(|transformer| transformer.get_mut("path"))
        {
            if let Some(replaced) = path.as_str().map(|current| current.replace(placeholder, user)) {
                *path = Value::from(replaced);
                patched += 1;
            }
        }
        patched
    }
}

/// Result of one restart attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// Exit code zero
    Restarted {
        /// Captured standard output
        stdout: String,
    },
    /// Non-zero exit
    Failed {
        /// Exit code, `None` when killed by a signal
        exit_code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },
    /// The restart command is not on PATH
    CommandNotFound,
    /// The restart command outlived its timeout
    TimedOut,
    /// The command could not be run
    Error(String),
}

impl RestartOutcome {
    /// Whether the router restarted
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Restarted { .. })
    }
}

/// Restarts the process consuming the router config
#[async_trait]
pub trait RouterRestarter: Send + Sync {
    /// Restart the router and report how it went
    async fn restart(&self) -> RestartOutcome;
}

/// Restarts the router through a shell command
pub struct ShellRestarter {
    executor: Arc<dyn CommandExecutor>,
    command_line: String,
    timeout: Duration,
}

impl ShellRestarter {
    /// Run `ccr restart` with the default timeout
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self::with_command(
            executor,
            RESTART_COMMAND,
            Duration::from_secs(RESTART_TIMEOUT_SECS),
        )
    }

    /// Run an arbitrary command line
    pub fn with_command(
        executor: Arc<dyn CommandExecutor>,
        command_line: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            executor,
            command_line: command_line.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RouterRestarter for ShellRestarter {
    async fn restart(&self) -> RestartOutcome {
        let program = self
            .command_line
            .split_whitespace()
            .next()
            .unwrap_or_default();
        if self.executor.check_command_exists(program).await.is_err() {
            return RestartOutcome::CommandNotFound;
        }

        match self
            .executor
            .run_shell(&self.command_line, self.timeout)
            .await
        {
            Ok(output) if output.success() => RestartOutcome::Restarted {
                stdout: output.stdout,
            },
            Ok(output) => RestartOutcome::Failed {
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            },
            Err(e) if e.downcast_ref::<CommandTimedOut>().is_some() => RestartOutcome::TimedOut,
            Err(e) => RestartOutcome::Error(format!("{e:#}")),
        }
    }
}

/// Reasons a sync stops before the restart step
#[derive(Debug, Error)]
pub enum SyncError {
    /// No router config at the expected path
    #[error("router config not found at {}", .0.display())]
    ConfigMissing(PathBuf),
    /// The router config could not be read
    #[error("failed to read router config {}: {reason}", path.display())]
    ConfigUnreadable {
        /// Router config path
        path: PathBuf,
        /// Underlying failure
        reason: anyhow::Error,
    },
    /// The router config is not valid JSON
    #[error("router config {} is not valid JSON: {source}", path.display())]
    ConfigMalformed {
        /// Router config path
        path: PathBuf,
        /// Parser error
        source: serde_json::Error,
    },
    /// `Providers` is present but is not a list
    #[error("router config {}: \"Providers\" is not a list", .0.display())]
    ProvidersNotList(PathBuf),
    /// The roster has nothing to publish
    #[error("no account has an API key to publish")]
    NoKeys,
    /// The updated config could not be written
    #[error("failed to write router config {}: {reason}", path.display())]
    WriteFailed {
        /// Router config path
        path: PathBuf,
        /// Underlying failure
        reason: anyhow::Error,
    },
    /// The updated config could not be serialized
    #[error("failed to serialize router config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome of a sync that reached the restart step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of keys published
    pub key_count: usize,
    /// What happened to the managed provider entry
    pub change: ProviderChange,
    /// Restart result; a failed restart does not undo the config write
    pub restart: RestartOutcome,
}

impl SyncReport {
    /// Config written and router restarted
    pub const fn is_success(&self) -> bool {
        self.restart.is_success()
    }
}

/// Load the router config at `path`
pub fn load_router_config(fs: &dyn FileSystem, path: &Path) -> Result<RouterConfig, SyncError> {
    if !fs.exists(path) {
        return Err(SyncError::ConfigMissing(path.to_path_buf()));
    }
    let content = fs
        .read_to_string(path)
        .map_err(|reason| SyncError::ConfigUnreadable {
            path: path.to_path_buf(),
            reason,
        })?;
    RouterConfig::from_json(&content).map_err(|source| SyncError::ConfigMalformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the router config to `path`
pub fn save_router_config(
    fs: &dyn FileSystem,
    path: &Path,
    config: &RouterConfig,
) -> Result<(), SyncError> {
    let content = config.to_json_pretty()?;
    fs.write_string(path, &content)
        .map_err(|reason| SyncError::WriteFailed {
            path: path.to_path_buf(),
            reason,
        })
}

/// Publish the roster's keys into the router config and restart the router
pub async fn sync_router_config(
    fs: &dyn FileSystem,
    restarter: &dyn RouterRestarter,
    config_path: &Path,
    roster: &Roster,
) -> Result<SyncReport, SyncError> {
    let mut config = load_router_config(fs, config_path)?;

    let api_keys = roster.aggregate_keys();
    if api_keys.is_empty() {
        return Err(SyncError::NoKeys);
    }
    let key_count = api_keys.split(',').count();
    tracing::debug!(key_count, path = %config_path.display(), "publishing keys");

    let change = config
        .upsert_provider_key(&api_keys)
        .ok_or_else(|| SyncError::ProvidersNotList(config_path.to_path_buf()))?;
    save_router_config(fs, config_path, &config)?;

    let restart = restarter.restart().await;
    if !restart.is_success() {
        tracing::warn!(?restart, "router restart failed; config changes are kept");
    }

    Ok(SyncReport {
        key_count,
        change,
        restart,
    })
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
