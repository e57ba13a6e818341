//! Router status panel

use std::sync::Arc;

use flowkeys_runtime::deps::{FileSystem, MessageStyle, Platform, UserInterface};

use crate::provision::{RouterLayout, RouterStatus, router_status};

/// Dependencies for the status panel
pub struct StatusDependencies {
    /// User interface for output
    pub ui: Arc<dyn UserInterface>,
    /// File system used to probe the router files
    pub file_system: Arc<dyn FileSystem>,
}

const fn mark(present: bool) -> &'static str {
    if present { "OK" } else { "X" }
}

/// Print which router files exist under `layout`
pub fn execute_with_deps(
    platform: Platform,
    layout: &RouterLayout,
    deps: &StatusDependencies,
) -> RouterStatus {
    let status = router_status(deps.file_system.as_ref(), platform, layout);

    deps.ui.print_styled("[ Router status ]", MessageStyle::Cyan);
    deps.ui
        .print(&format!("  Platform: {}", status.platform.display_name()));
    deps.ui.print(&format!(
        "  Config {} | Header {}",
        mark(status.config_exists),
        mark(status.header_exists)
    ));
    deps.ui
        .print(&format!("  Path: {}", status.base.display()));

    status
}
