//! Core runtime for the flowkeys CLI
//!
//! This crate contains the foundational types used across the flowkeys
//! workspace: configuration constants, resolved settings, and the
//! dependency injection interfaces every command is written against.

/// Configuration constants and resolved settings
pub mod config;
/// Dependency injection traits and implementations
pub mod deps;

// Re-export commonly used types at the crate root
pub use config::{
    API_URL_ENV_VAR, DEFAULT_API_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS, RESTART_TIMEOUT_SECS,
    ROUTER_HOME_ENV_VAR, STORE_PATH_ENV_VAR, Settings,
};
pub use deps::{
    Clock, CommandExecutor, CommandOutput, CommandTimedOut, Environment, FileSystem, HttpClient,
    HttpResponse, InputInterrupted, MessageStyle, Platform, ProgressIndicator, RealClock,
    RealCommandExecutor, RealEnvironment, RealFileSystem, RealHttpClient, UserInterface,
};
