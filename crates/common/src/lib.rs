//! Shared terminal helpers for the flowkeys CLI

/// User interface implementations
pub mod ui;

pub use ui::{RealUserInterface, TestUserInterface, parse_confirmation};
