//! Provision the router configuration from the published templates

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};

use flowkeys_runtime::Settings;
use flowkeys_runtime::deps::{Environment, FileSystem, HttpClient, MessageStyle, UserInterface};

use crate::commands::menu::MenuDependencies;
use crate::provision::{RouterLayout, initialize, platform_base_dir};
use crate::store::Roster;

/// Dependencies for the init command
pub struct InitDependencies {
    /// User interface for output
    pub ui: Arc<dyn UserInterface>,
    /// File system the router files are written to
    pub file_system: Arc<dyn FileSystem>,
    /// Client used to download the templates
    pub http_client: Arc<dyn HttpClient>,
    /// Platform and login name
    pub environment: Arc<dyn Environment>,
}

/// Download the templates and write the router files. `router_home`
/// overrides the platform default directory. Returns whether provisioning
/// succeeded.
pub async fn execute_with_deps(
    roster: &Roster,
    router_home: Option<&Path>,
    deps: &InitDependencies,
) -> bool {
    deps.ui
        .print_styled("Initializing router config...", MessageStyle::Cyan);

    let user = match deps.environment.login_name() {
        Ok(user) => user,
        Err(e) => {
            deps.ui
                .print_styled(&format!("❌ {e:#}"), MessageStyle::Error);
            return false;
        }
    };
    let platform = deps.environment.platform();
    let layout = router_home.map_or_else(
        || RouterLayout::from_base(platform_base_dir(platform, &user)),
        RouterLayout::from_base,
    );
    tracing::debug!(
        platform = platform.display_name(),
        user = %user,
        base = %layout.base.display(),
        "provisioning router"
    );

    match initialize(
        deps.http_client.as_ref(),
        deps.file_system.as_ref(),
        &layout,
        &user,
        roster,
    )
    .await
    {
        Ok(report) => {
            if report.created_plugins_dir {
                deps.ui.print(&format!(
                    "Created {}",
                    report.layout.plugins.display()
                ));
            }
            deps.ui.print_styled("✅ header.js saved", MessageStyle::Success);
            if report.key_count == 0 {
                deps.ui.print_styled(
                    "⚠️ No API keys yet; api_key set to a placeholder",
                    MessageStyle::Warning,
                );
            } else {
                deps.ui.print_styled(
                    &format!("✅ Wrote {} API key(s)", report.key_count),
                    MessageStyle::Success,
                );
            }
            deps.ui.print_styled(
                &format!(
                    "✅ Router config initialized: {}",
                    report.layout.config.display()
                ),
                MessageStyle::Success,
            );
            true
        }
        Err(e) => {
            deps.ui
                .print_styled(&format!("❌ {e}"), MessageStyle::Error);
            deps.ui
                .print_styled("❌ Router initialization failed", MessageStyle::Error);
            false
        }
    }
}

/// Provision the router with production dependencies
pub async fn execute(settings: &Settings) -> Result<()> {
    let deps = MenuDependencies::production(settings)?;
    let roster = deps.load_roster(settings)?;
    if !execute_with_deps(&roster, settings.router_home.as_deref(), &deps.init_deps()).await {
        bail!("Router initialization failed");
    }
    Ok(())
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
