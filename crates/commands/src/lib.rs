//! Account management for the flowkeys CLI
//!
//! The core modules evaluate key expiry, persist the roster, talk to the
//! upstream platform, and keep the router configuration in sync. The
//! `commands` module holds the menu actions built on top of them.

/// Menu actions and one-shot subcommands
pub mod commands;

/// Key expiry evaluation
pub mod expiry;

/// First-time router setup
pub mod provision;

/// Router configuration sync
pub mod router;

/// Roster persistence
pub mod store;

/// Upstream platform client
pub mod upstream;

#[cfg(test)]
pub mod test_helpers;

pub use commands::{add, delete, init, list, menu, refresh, status, sync};
