//! Account roster persistence
//!
//! The roster lives in a single JSON file shaped as
//! `{ "accounts": [ { "BXAuth", "apiKey", "name", "expireTime" } ] }`.
//! The whole file is read at the start of each cycle and rewritten after
//! every mutation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use flowkeys_runtime::deps::FileSystem;

/// Errors raised by [`CredentialStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file exists but does not hold a valid roster
    #[error("credential store {} is not valid JSON: {source}", path.display())]
    Malformed {
        /// Roster file
        path: PathBuf,
        /// Parser error
        source: serde_json::Error,
    },
    /// The file could not be read or written
    #[error("failed to access credential store {}: {reason}", path.display())]
    Io {
        /// Roster file
        path: PathBuf,
        /// Underlying failure
        reason: anyhow::Error,
    },
    /// The roster could not be serialized
    #[error("failed to serialize credential store: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One managed account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Long-lived session token, never rewritten after add
    #[serde(rename = "BXAuth", default, deserialize_with = "string_or_null")]
    pub session_token: String,
    /// Short-lived key derived from the session token
    #[serde(rename = "apiKey", default, deserialize_with = "string_or_null")]
    pub api_key: String,
    /// Display name resolved once at add time
    #[serde(default, deserialize_with = "string_or_null")]
    pub name: String,
    /// `YYYY-MM-DD HH:MM` local time, possibly empty
    #[serde(rename = "expireTime", default, deserialize_with = "string_or_null")]
    pub expires_at: String,
}

/// Key material returned by one successful key issuance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Freshly issued API key
    pub api_key: String,
    /// Expiry of that key
    pub expires_at: String,
}

impl Credential {
    /// Build a new roster entry from its token, name, and first key
    pub fn new(session_token: impl Into<String>, name: impl Into<String>, info: KeyInfo) -> Self {
        Self {
            session_token: session_token.into(),
            api_key: info.api_key,
            name: name.into(),
            expires_at: info.expires_at,
        }
    }

    /// Replace key and expiry together; token and name stay untouched
    pub fn apply_key_info(&mut self, info: KeyInfo) {
        self.api_key = info.api_key;
        self.expires_at = info.expires_at;
    }
}

/// The ordered account list, as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// Accounts in insertion order; duplicates are allowed
    #[serde(default)]
    pub accounts: Vec<Credential>,
}

impl Roster {
    /// Append a credential
    pub fn add(&mut self, credential: Credential) {
        self.accounts.push(credential);
    }

    /// Remove the credential at `index`, keeping the order of the rest
    pub fn remove_at(&mut self, index: usize) -> Option<Credential> {
        (index < self.accounts.len()).then(|| self.accounts.remove(index))
    }

    /// Number of credentials
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the roster holds no credentials
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Comma-joined non-empty keys, see [`aggregate_keys`]
    pub fn aggregate_keys(&self) -> String {
        aggregate_keys(&self.accounts)
    }
}

/// Comma-joined `apiKey` values of all credentials with a non-empty key,
/// in roster order
pub fn aggregate_keys(accounts: &[Credential]) -> String {
    accounts
        .iter()
        .map(|account| account.api_key.as_str())
        .filter(|key| !key.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// File-backed roster storage
#[derive(Clone)]
pub struct CredentialStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl CredentialStore {
    /// Create a store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the roster; a missing file is an empty roster
    pub fn load(&self) -> Result<Roster, StoreError> {
        if !self.fs.exists(&self.path) {
            tracing::debug!(path = %self.path.display(), "no roster file yet");
            return Ok(Roster::default());
        }

        let content = self
            .fs
            .read_to_string(&self.path)
            .map_err(|reason| StoreError::Io {
                path: self.path.clone(),
                reason,
            })?;

        serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Rewrite the whole roster file
    pub fn save(&self, roster: &Roster) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(roster)?;
        self.fs
            .write_string(&self.path, &content)
            .map_err(|reason| StoreError::Io {
                path: self.path.clone(),
                reason,
            })?;
        tracing::debug!(path = %self.path.display(), accounts = roster.len(), "roster saved");
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
