//! First-time router setup
//!
//! Downloads the header transformer script and the config template, adapts
//! the template to the local user and roster, and writes both into the
//! router's directory.

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;

use flowkeys_runtime::config::{
    API_KEY_PLACEHOLDER, CONFIG_TEMPLATE_URL, HEADER_SCRIPT_FILE, HEADER_SCRIPT_URL,
    PLUGINS_DIR_NAME, ROUTER_CONFIG_FILE, ROUTER_DIR_NAME, TEMPLATE_USER_PLACEHOLDER,
};
use flowkeys_runtime::deps::{Environment, FileSystem, HttpClient, Platform};

use crate::router::RouterConfig;
use crate::store::Roster;

/// Files and directories the router reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterLayout {
    /// Router home directory
    pub base: PathBuf,
    /// Plugin directory
    pub plugins: PathBuf,
    /// Header transformer script
    pub header_script: PathBuf,
    /// Router configuration file
    pub config: PathBuf,
}

impl RouterLayout {
    /// Derive the layout from the router home directory
    pub fn from_base(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let plugins = base.join(PLUGINS_DIR_NAME);
        Self {
            header_script: plugins.join(HEADER_SCRIPT_FILE),
            config: base.join(ROUTER_CONFIG_FILE),
            plugins,
            base,
        }
    }

    /// The explicit router home if given, otherwise the platform default for
    /// the current login name
    pub fn resolve(router_home: Option<&Path>, env: &dyn Environment) -> Result<Self> {
        if let Some(home) = router_home {
            return Ok(Self::from_base(home));
        }
        let user = env.login_name()?;
        Ok(Self::from_base(platform_base_dir(env.platform(), &user)))
    }
}

/// Router home for `user` on `platform`
pub fn platform_base_dir(platform: Platform, user: &str) -> PathBuf {
    let home = match platform {
        Platform::Windows => format!("C:/Users/{user}"),
        Platform::MacOs => format!("/Users/{user}"),
        Platform::Linux | Platform::Other(_) => format!("/home/{user}"),
    };
    Path::new(&home).join(ROUTER_DIR_NAME)
}

/// Snapshot of the router files, shown under the roster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterStatus {
    /// Platform the tool runs on
    pub platform: Platform,
    /// Router home directory
    pub base: PathBuf,
    /// Whether `config.json` exists
    pub config_exists: bool,
    /// Whether `plugins/header.js` exists
    pub header_exists: bool,
}

/// Inspect the router files described by `layout`
pub fn router_status(fs: &dyn FileSystem, platform: Platform, layout: &RouterLayout) -> RouterStatus {
    RouterStatus {
        platform,
        base: layout.base.clone(),
        config_exists: fs.exists(&layout.config),
        header_exists: fs.exists(&layout.header_script),
    }
}

/// Reasons provisioning stops
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A directory could not be created
    #[error("failed to create directory {}: {reason}", path.display())]
    CreateDir {
        /// Directory path
        path: PathBuf,
        /// Underlying failure
        reason: anyhow::Error,
    },
    /// A template could not be fetched
    #[error("failed to download {url}: {reason}")]
    Download {
        /// Template URL
        url: String,
        /// Underlying failure
        reason: anyhow::Error,
    },
    /// A template fetch returned something other than 200
    #[error("downloading {url} returned HTTP {status}")]
    DownloadStatus {
        /// Template URL
        url: String,
        /// HTTP status code
        status: u16,
    },
    /// The config template is not a valid router config
    #[error("config template from {url} is not valid JSON: {source}")]
    MalformedTemplate {
        /// Template URL
        url: String,
        /// Parser error
        source: serde_json::Error,
    },
    /// A file could not be written
    #[error("failed to write {}: {reason}", path.display())]
    Write {
        /// File path
        path: PathBuf,
        /// Underlying failure
        reason: anyhow::Error,
    },
    /// The adapted config could not be serialized
    #[error("failed to serialize router config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What provisioning did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Where the files went
    pub layout: RouterLayout,
    /// Whether the plugin directory had to be created
    pub created_plugins_dir: bool,
    /// Keys written into the provider entry; zero means the placeholder
    pub key_count: usize,
    /// Whether the template carried the managed provider entry
    pub provider_updated: bool,
    /// Transformer paths rewritten for the local user
    pub patched_transformers: usize,
}

async fn download(http: &dyn HttpClient, url: &str) -> Result<String, ProvisionError> {
    tracing::debug!(url, "downloading template");
    let response = http.get(url).await.map_err(|reason| ProvisionError::Download {
        url: url.to_string(),
        reason,
    })?;
    if !response.is_ok() {
        return Err(ProvisionError::DownloadStatus {
            url: url.to_string(),
            status: response.status,
        });
    }
    Ok(response.body)
}

fn write(fs: &dyn FileSystem, path: &Path, content: &str) -> Result<(), ProvisionError> {
    fs.write_string(path, content)
        .map_err(|reason| ProvisionError::Write {
            path: path.to_path_buf(),
            reason,
        })
}

/// Provision the router files in `layout` for `user`.
///
/// Both templates are downloaded before anything is written, so a failed
/// download leaves existing files untouched. The managed provider entry is
/// only updated when the template carries it.
pub async fn initialize(
    http: &dyn HttpClient,
    fs: &dyn FileSystem,
    layout: &RouterLayout,
    user: &str,
    roster: &Roster,
) -> Result<ProvisionReport, ProvisionError> {
    let created_plugins_dir = !fs.exists(&layout.plugins);
    if created_plugins_dir {
        fs.create_dir_all(&layout.plugins)
            .map_err(|reason| ProvisionError::CreateDir {
                path: layout.plugins.clone(),
                reason,
            })?;
    }

    let header_script = download(http, HEADER_SCRIPT_URL).await?;
    let template = download(http, CONFIG_TEMPLATE_URL).await?;
    let mut config =
        RouterConfig::from_json(&template).map_err(|source| ProvisionError::MalformedTemplate {
            url: CONFIG_TEMPLATE_URL.to_string(),
            source,
        })?;

    let patched_transformers = config.patch_transformer_paths(TEMPLATE_USER_PLACEHOLDER, user);

    let api_keys = roster.aggregate_keys();
    let key_count = if api_keys.is_empty() {
        0
    } else {
        api_keys.split(',').count()
    };
    let provider_keys = if api_keys.is_empty() {
        API_KEY_PLACEHOLDER
    } else {
        api_keys.as_str()
    };
    let provider_updated = config.update_provider_key(provider_keys);
    if !provider_updated {
        tracing::warn!("config template has no managed provider entry");
    }

    write(fs, &layout.header_script, &header_script)?;
    write(fs, &layout.config, &config.to_json_pretty()?)?;

    Ok(ProvisionReport {
        layout: layout.clone(),
        created_plugins_dir,
        key_count,
        provider_updated,
        patched_transformers,
    })
}

#[cfg(test)]
#[path = "provision_tests.rs"]
mod tests;
