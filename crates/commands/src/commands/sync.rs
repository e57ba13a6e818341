//! Publish roster keys to the router and restart it

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};

use flowkeys_runtime::Settings;
use flowkeys_runtime::deps::{FileSystem, MessageStyle, UserInterface};

use crate::commands::menu::{MenuDependencies, sync_roster};
use crate::router::{ProviderChange, RestartOutcome, RouterRestarter, sync_router_config};
use crate::store::Roster;

/// Dependencies for the sync command
pub struct SyncDependencies {
    /// User interface for output
    pub ui: Arc<dyn UserInterface>,
    /// File system holding the router config
    pub file_system: Arc<dyn FileSystem>,
    /// Restarts the router after the config changes
    pub restarter: Arc<dyn RouterRestarter>,
}

fn report_restart(ui: &dyn UserInterface, outcome: &RestartOutcome) {
    match outcome {
        RestartOutcome::Restarted { stdout } => {
            ui.print_styled("✅ Router restarted", MessageStyle::Success);
            if !stdout.trim().is_empty() {
                ui.print("--- log ---");
                ui.print(stdout.trim_end());
            }
        }
        RestartOutcome::Failed {
            exit_code,
            stdout,
            stderr,
        } => {
            let code = exit_code.map_or_else(|| "signal".to_string(), |code| code.to_string());
            ui.print_styled(
                &format!("❌ Router restart failed (exit code: {code})"),
                MessageStyle::Error,
            );
            if !stderr.trim().is_empty() {
                ui.print_styled(&format!("Error: {}", stderr.trim_end()), MessageStyle::Red);
            }
            if !stdout.trim().is_empty() {
                ui.print(&format!("Output: {}", stdout.trim_end()));
            }
        }
        RestartOutcome::CommandNotFound => ui.print_styled(
            "⚠️ ccr not found; make sure it is installed and on PATH",
            MessageStyle::Warning,
        ),
        RestartOutcome::TimedOut => {
            ui.print_styled("❌ Router restart timed out", MessageStyle::Error);
        }
        RestartOutcome::Error(reason) => ui.print_styled(
            &format!("❌ Failed to run the restart command: {reason}"),
            MessageStyle::Error,
        ),
    }
}

/// Write the roster's keys into the router config at `config_path` and
/// restart the router. Returns whether both steps succeeded.
pub async fn execute_with_deps(roster: &Roster, config_path: &Path, deps: &SyncDependencies) -> bool {
    tracing::debug!(path = %config_path.display(), "syncing router config");

    let report = match sync_router_config(
        deps.file_system.as_ref(),
        deps.restarter.as_ref(),
        config_path,
        roster,
    )
    .await
    {
        Ok(report) => report,
        Err(e) => {
            deps.ui
                .print_styled(&format!("⚠️ {e}"), MessageStyle::Warning);
            return false;
        }
    };

    let action = match report.change {
        ProviderChange::Updated => "updated",
        ProviderChange::Appended => "added",
    };
    deps.ui.print_styled(
        &format!(
            "✅ Router config {action} with {} key(s)",
            report.key_count
        ),
        MessageStyle::Success,
    );

    report_restart(deps.ui.as_ref(), &report.restart);
    report.is_success()
}

/// Sync with production dependencies
pub async fn execute(settings: &Settings) -> Result<()> {
    let deps = MenuDependencies::production(settings)?;
    let roster = deps.load_roster(settings)?;
    if !sync_roster(&roster, settings, &deps).await {
        bail!("Router sync failed");
    }
    Ok(())
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
