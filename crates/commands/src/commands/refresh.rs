//! Renew API keys for accounts in the roster

use std::sync::Arc;

use anyhow::{Context, Result, bail};

use flowkeys_runtime::Settings;
use flowkeys_runtime::deps::{Clock, MessageStyle, UserInterface};

use crate::commands::menu::{MenuDependencies, sync_roster};
use crate::expiry::evaluate;
use crate::store::{CredentialStore, Roster};
use crate::upstream::{CredentialSource, UNKNOWN_NAME};

/// Which accounts a refresh touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Only expired or expiring accounts, after confirmation
    Smart,
    /// Every account, without confirmation
    Force,
}

/// Dependencies for the refresh command
pub struct RefreshDependencies {
    /// User interface for prompts and output
    pub ui: Arc<dyn UserInterface>,
    /// Clock used to select accounts in smart mode
    pub clock: Arc<dyn Clock>,
    /// Roster persistence
    pub store: CredentialStore,
    /// Upstream key issuance
    pub source: Arc<dyn CredentialSource>,
}

/// Result of one refresh batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Accounts a new key was requested for
    pub attempted: usize,
    /// Accounts that received a new key
    pub refreshed: usize,
}

fn select(roster: &Roster, mode: RefreshMode, deps: &RefreshDependencies) -> Vec<usize> {
    match mode {
        RefreshMode::Force => (0..roster.len()).collect(),
        RefreshMode::Smart => {
            let now = deps.clock.now();
            roster
                .accounts
                .iter()
                .enumerate()
                .filter(|(_, account)| evaluate(&account.expires_at, now).status.needs_refresh())
                .map(|(index, _)| index)
                .collect()
        }
    }
}

/// Refresh the accounts selected by `mode`.
///
/// Requests run one after another; a failed request leaves that account as
/// it was and the batch continues. The roster is saved once after the batch.
/// `assume_yes` skips the smart-mode confirmation.
pub async fn execute_with_deps(
    roster: &mut Roster,
    mode: RefreshMode,
    assume_yes: bool,
    deps: &RefreshDependencies,
) -> Result<RefreshReport> {
    if roster.is_empty() {
        deps.ui
            .print_styled("No accounts to refresh", MessageStyle::Yellow);
        return Ok(RefreshReport::default());
    }

    let selected = select(roster, mode, deps);
    if mode == RefreshMode::Smart {
        if selected.is_empty() {
            deps.ui.print_styled(
                "All accounts are healthy; nothing to refresh",
                MessageStyle::Success,
            );
            return Ok(RefreshReport::default());
        }

        deps.ui.print_styled(
            &format!("{} account(s) expired or expiring", selected.len()),
            MessageStyle::Yellow,
        );
        if !assume_yes && !deps.ui.prompt_confirm("Refresh these accounts?", true)? {
            return Ok(RefreshReport::default());
        }
    }

    let mut report = RefreshReport {
        attempted: selected.len(),
        refreshed: 0,
    };
    for index in selected {
        let account = &mut roster.accounts[index];
        let name = if account.name.is_empty() {
            UNKNOWN_NAME.to_string()
        } else {
            account.name.clone()
        };

        match deps.source.resolve_key_info(&account.session_token).await {
            Some(info) => {
                account.apply_key_info(info);
                report.refreshed += 1;
                deps.ui
                    .print_styled(&format!("  🔄 {name} ✅"), MessageStyle::Green);
            }
            None => {
                deps.ui
                    .print_styled(&format!("  🔄 {name} ❌"), MessageStyle::Red);
            }
        }
    }

    deps.store
        .save(roster)
        .context("Failed to save refreshed accounts")?;

    let label = match mode {
        RefreshMode::Smart => "Refresh complete",
        RefreshMode::Force => "Forced refresh complete",
    };
    deps.ui.print_styled(
        &format!("{label}: {}/{}", report.refreshed, report.attempted),
        MessageStyle::Success,
    );
    Ok(report)
}

/// Refresh command arguments (matches CLI parser)
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshArgs {
    /// Refresh every account instead of only the due ones
    pub force: bool,
    /// Skip the confirmation prompt
    pub yes: bool,
}

/// Refresh with production dependencies, then sync the router if any key
/// changed
pub async fn execute(settings: &Settings, args: RefreshArgs) -> Result<()> {
    let deps = MenuDependencies::production(settings)?;
    let mut roster = deps.load_roster(settings)?;
    let mode = if args.force {
        RefreshMode::Force
    } else {
        RefreshMode::Smart
    };

    let report =
        execute_with_deps(&mut roster, mode, args.yes, &deps.refresh_deps(settings)).await?;
    if report.refreshed > 0 {
        sync_roster(&roster, settings, &deps).await;
    }
    if report.refreshed < report.attempted {
        bail!(
            "{} of {} account(s) could not be refreshed",
            report.attempted - report.refreshed,
            report.attempted
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
