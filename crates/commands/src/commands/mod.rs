//! Menu actions and one-shot subcommands

/// Add an account
pub mod add;
/// Delete an account
pub mod delete;
/// Provision the router files
pub mod init;
/// Roster table
pub mod list;
/// Interactive menu
pub mod menu;
/// Key renewal
pub mod refresh;
/// Router status panel
pub mod status;
/// Router config sync
pub mod sync;
