//! Dependency injection traits for testability
//!
//! This module provides trait abstractions for all external dependencies,
//! allowing for easy mocking and testing.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};

use crate::config::DEFAULT_HTTP_TIMEOUT_SECS;

/// File system operations
pub trait FileSystem: Send + Sync {
    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Read a file to string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Replace a file's content with `content`
    fn write_string(&self, path: &Path, content: &str) -> Result<()>;

    /// Create a directory and all missing parents
    fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// Command execution operations
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Check if a command exists in PATH
    async fn check_command_exists(&self, command: &str) -> Result<()>;

    /// Run a command line through the platform shell, giving up after `timeout`
    async fn run_shell(&self, command_line: &str, timeout: Duration) -> Result<CommandOutput>;
}

/// Output from command execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with code zero
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Returned by [`CommandExecutor::run_shell`] when the timeout elapses
#[derive(Debug, thiserror::Error)]
#[error("command timed out after {0:?}")]
pub struct CommandTimedOut(pub Duration);

/// Returned by interactive prompts when the user presses Ctrl-C
#[derive(Debug, thiserror::Error)]
#[error("input interrupted")]
pub struct InputInterrupted;

/// Plain HTTP fetches
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a GET request and return status and body
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Status and body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is exactly 200
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Time/clock operations
pub trait Clock: Send + Sync {
    /// Current naive local time
    fn now(&self) -> NaiveDateTime;
}

/// Operating systems the router layout distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Microsoft Windows
    Windows,
    /// Apple macOS
    MacOs,
    /// Linux
    Linux,
    /// Anything else, laid out like Linux
    Other(&'static str),
}

impl Platform {
    /// Map a `std::env::consts::OS` identifier
    pub const fn from_os(os: &'static str) -> Self {
        match os.as_bytes() {
            b"windows" => Self::Windows,
            b"macos" => Self::MacOs,
            b"linux" => Self::Linux,
            _ => Self::Other(os),
        }
    }

    /// Platform of the running process
    pub const fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Human readable platform name
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Other(os) => os,
        }
    }
}

/// Process environment queries
pub trait Environment: Send + Sync {
    /// Platform the process runs on
    fn platform(&self) -> Platform;

    /// Login name of the current OS user
    fn login_name(&self) -> Result<String>;
}

/// User interface operations
pub trait UserInterface: Send + Sync {
    /// Create a spinner progress indicator
    fn create_spinner(&self) -> Box<dyn ProgressIndicator>;

    /// Print a message
    fn print(&self, message: &str);

    /// Print a styled message
    fn print_styled(&self, message: &str, style: MessageStyle);

    /// Check if running in interactive mode
    fn is_interactive(&self) -> bool;

    /// Prompt for text input
    fn prompt_input(&self, prompt: &str, default: Option<&str>) -> Result<String>;

    /// Prompt for a yes/no answer
    fn prompt_confirm(&self, prompt: &str, default: bool) -> Result<bool>;
}

/// Progress indicator trait
pub trait ProgressIndicator: Send + Sync {
    /// Set the message
    fn set_message(&self, message: &str);

    /// Enable steady tick
    fn enable_steady_tick(&self, duration: Duration);

    /// Finish and clear the progress
    fn finish_and_clear(&self);
}

/// Message styling options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStyle {
    /// Unstyled text
    Normal,
    /// Bold text style
    Bold,
    /// Cyan colored text
    Cyan,
    /// Green colored text
    Green,
    /// Red colored text
    Red,
    /// Yellow colored text
    Yellow,
    /// Warning style (typically yellow)
    Warning,
    /// Error style (typically red)
    Error,
    /// Success style (typically green)
    Success,
}

// Production implementations

/// Production file system implementation
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read file {}: {}", path.display(), e))
    }

    // Writes land in a sibling temp file that is renamed over the target.
    fn write_string(&self, path: &Path, content: &str) -> Result<()> {
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write file {}", path.display()))?;
        tmp.persist(path)
            .map_err(|e| anyhow!("Failed to write file {}: {}", path.display(), e.error))?;
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)
            .map_err(|e| anyhow!("Failed to create directory {}: {}", path.display(), e))
    }
}

/// Production command executor implementation
pub struct RealCommandExecutor;

#[async_trait]
impl CommandExecutor for RealCommandExecutor {
    async fn check_command_exists(&self, command: &str) -> Result<()> {
        which::which(command)
            .map(|_| ())
            .map_err(|_| anyhow!("{} not found in PATH", command))
    }

    async fn run_shell(&self, command_line: &str, timeout: Duration) -> Result<CommandOutput> {
        let mut command = if cfg!(windows) {
            let mut command = tokio::process::Command::new("cmd");
            command.args(["/C", command_line]);
            command
        } else {
            let mut command = tokio::process::Command::new("sh");
            command.args(["-c", command_line]);
            command
        };
        command.kill_on_drop(true);

        tracing::debug!(command = command_line, "running shell command");
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| CommandTimedOut(timeout))?
            .map_err(|e| anyhow!("Failed to execute {}: {}", command_line, e))?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Production HTTP client backed by reqwest
pub struct RealHttpClient {
    client: reqwest::Client,
}

impl RealHttpClient {
    /// Build a client with the default request timeout
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for RealHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch {}: {}", url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response from {}: {}", url, e))?;

        Ok(HttpResponse { status, body })
    }
}

/// Production clock implementation
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Production environment implementation
pub struct RealEnvironment;

impl Environment for RealEnvironment {
    fn platform(&self) -> Platform {
        Platform::current()
    }

    fn login_name(&self) -> Result<String> {
        let var = |name: &str| std::env::var(name).ok();
        login_name_from(
            var("SUDO_USER"),
            dirs::home_dir().as_deref(),
            [var("LOGNAME"), var("USER"), var("USERNAME")],
        )
        .context("Could not determine the current login name")
    }
}

/// Pick the invoking user's login name.
///
/// Order: `SUDO_USER`, the home directory's last component, then the first
/// non-empty user variable.
pub fn login_name_from(
    sudo_user: Option<String>,
    home: Option<&Path>,
    user_vars: [Option<String>; 3],
) -> Option<String> {
    let non_empty = |name: String| {
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    };

    sudo_user
        .and_then(non_empty)
        .or_else(|| {
            home.and_then(Path::file_name)
                .map(|name| name.to_string_lossy().into_owned())
                .and_then(non_empty)
        })
        .or_else(|| user_vars.into_iter().flatten().find_map(non_empty))
}

#[cfg(test)]
#[path = "deps_tests.rs"]
mod tests;
