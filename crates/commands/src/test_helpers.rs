//! Test helper utilities and mock implementations for flowkeys-commands

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use mockall::mock;

use flowkeys_runtime::deps::*;

use crate::router::{RestartOutcome, RouterRestarter};
use crate::store::{Credential, KeyInfo};
use crate::upstream::CredentialSource;

pub use flowkeys_common::ui::TestUserInterface;

// Mock implementation of the FileSystem trait.
//
// Use it when a test must assert exactly how often the disk is touched;
// otherwise `MemoryFileSystem` is less noisy.
mock! {
    pub FileSystemMock {}

    impl FileSystem for FileSystemMock {
        fn exists(&self, path: &Path) -> bool;
        fn read_to_string(&self, path: &Path) -> Result<String>;
        fn write_string(&self, path: &Path, content: &str) -> Result<()>;
        fn create_dir_all(&self, path: &Path) -> Result<()>;
    }
}

mock! {
    pub CommandExecutorMock {}

    #[async_trait]
    impl CommandExecutor for CommandExecutorMock {
        async fn check_command_exists(&self, command: &str) -> Result<()>;
        async fn run_shell(&self, command_line: &str, timeout: Duration) -> Result<CommandOutput>;
    }
}

mock! {
    pub HttpClientMock {}

    #[async_trait]
    impl HttpClient for HttpClientMock {
        async fn get(&self, url: &str) -> Result<HttpResponse>;
    }
}

mock! {
    pub EnvironmentMock {}

    impl Environment for EnvironmentMock {
        fn platform(&self) -> Platform;
        fn login_name(&self) -> Result<String>;
    }
}

// Mock implementation of the CredentialSource trait.
//
// # Example
//
// ```rust
// let mut source = MockCredentialSourceMock::new();
// source.expect_resolve_key_info()
//     .times(1)
//     .returning(|_| Some(key_info("sk-new", "2030-01-01 00:00")));
// ```
mock! {
    pub CredentialSourceMock {}

    #[async_trait]
    impl CredentialSource for CredentialSourceMock {
        async fn resolve_display_name(&self, session_token: &str) -> String;
        async fn resolve_key_info(&self, session_token: &str) -> Option<KeyInfo>;
    }
}

mock! {
    pub RouterRestarterMock {}

    #[async_trait]
    impl RouterRestarter for RouterRestarterMock {
        async fn restart(&self) -> RestartOutcome;
    }
}

/// A clock frozen at one instant
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Freeze at a `YYYY-MM-DD HH:MM` timestamp
    pub fn at(timestamp: &str) -> Self {
        Self(parse_time(timestamp))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Parse a `YYYY-MM-DD HH:MM` timestamp, panicking on bad input
pub fn parse_time(timestamp: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(timestamp, crate::expiry::EXPIRY_FORMAT)
        .unwrap_or_else(|e| panic!("bad test timestamp {timestamp}: {e}"))
}

/// In-memory file system that records every write
#[derive(Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    writes: Mutex<Vec<PathBuf>>,
    dirs: Mutex<Vec<PathBuf>>,
    fail_writes: bool,
}

impl MemoryFileSystem {
    /// Empty file system
    pub fn new() -> Self {
        Self::default()
    }

    /// File system whose writes always fail
    pub fn read_only() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Seed a file
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Seed or replace a file
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), content.into());
    }

    /// Current content of a file
    pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    /// Paths written so far, in order
    pub fn writes(&self) -> Vec<PathBuf> {
        self.writes.lock().unwrap().clone()
    }

    /// Directories created so far, in order
    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().unwrap().clone()
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
            || self.dirs.lock().unwrap().iter().any(|dir| dir == path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.content(path)
            .ok_or_else(|| anyhow!("Failed to read file {}: not found", path.display()))
    }

    fn write_string(&self, path: &Path, content: &str) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("Failed to write file {}: read-only", path.display()));
        }
        self.writes.lock().unwrap().push(path.to_path_buf());
        self.insert(path, content);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.dirs.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Build a credential from its four fields
pub fn credential(token: &str, key: &str, name: &str, expires_at: &str) -> Credential {
    Credential {
        session_token: token.to_string(),
        api_key: key.to_string(),
        name: name.to_string(),
        expires_at: expires_at.to_string(),
    }
}

/// Build a key issuance result
pub fn key_info(key: &str, expires_at: &str) -> KeyInfo {
    KeyInfo {
        api_key: key.to_string(),
        expires_at: expires_at.to_string(),
    }
}

/// Serialize a roster file holding `accounts`
pub fn roster_json(accounts: &[Credential]) -> String {
    let roster = crate::store::Roster {
        accounts: accounts.to_vec(),
    };
    serde_json::to_string_pretty(&roster).unwrap()
}
