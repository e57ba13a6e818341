//! Roster table

use std::sync::Arc;

use anyhow::Result;
use console::{Alignment, pad_str};

use flowkeys_runtime::Settings;
use flowkeys_runtime::deps::{Clock, MessageStyle, UserInterface};

use crate::commands::menu::MenuDependencies;
use crate::expiry::{ExpiryStatus, evaluate};
use crate::store::Roster;
use crate::upstream::UNKNOWN_NAME;

/// Display widths of the table columns
const COLUMN_WIDTHS: [usize; 5] = [4, 13, 26, 16, 8];

/// Keys longer than this are cut and suffixed with `..`
const KEY_DISPLAY_CHARS: usize = 20;

/// Dependencies for the list command
pub struct ListDependencies {
    /// User interface for output
    pub ui: Arc<dyn UserInterface>,
    /// Clock used to evaluate expiry
    pub clock: Arc<dyn Clock>,
}

/// Counts shown under the table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterSummary {
    /// Credentials past their expiry
    pub expired: usize,
    /// Credentials expiring within a day
    pub expiring: usize,
}

/// Shorten an API key for display
pub fn truncate_key(key: &str) -> String {
    if key.chars().count() > KEY_DISPLAY_CHARS {
        let head: String = key.chars().take(KEY_DISPLAY_CHARS).collect();
        format!("{head}..")
    } else {
        key.to_string()
    }
}

fn border() -> String {
    let segments: Vec<String> = COLUMN_WIDTHS.iter().map(|w| "-".repeat(w + 2)).collect();
    format!("+{}+", segments.join("+"))
}

fn row(cells: [&str; 5]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(COLUMN_WIDTHS)
        .map(|(cell, width)| pad_str(cell, width, Alignment::Left, None).into_owned())
        .collect();
    format!("| {} |", padded.join(" | "))
}

const fn row_style(status: ExpiryStatus) -> MessageStyle {
    match status {
        ExpiryStatus::Expired => MessageStyle::Red,
        ExpiryStatus::Expiring => MessageStyle::Yellow,
        ExpiryStatus::Normal => MessageStyle::Green,
        ExpiryStatus::Unknown => MessageStyle::Normal,
    }
}

/// Print the roster as a table and count credentials needing attention
pub fn execute_with_deps(roster: &Roster, deps: &ListDependencies) -> RosterSummary {
    let mut summary = RosterSummary::default();

    if roster.is_empty() {
        deps.ui.print_styled("No accounts yet", MessageStyle::Yellow);
        return summary;
    }

    let now = deps.clock.now();
    deps.ui.print_styled(&border(), MessageStyle::Cyan);
    deps.ui.print_styled(
        &row(["#", "Account", "API Key", "Expires", "Left"]),
        MessageStyle::Cyan,
    );
    deps.ui.print_styled(&border(), MessageStyle::Cyan);

    for (index, account) in roster.accounts.iter().enumerate() {
        let remaining = evaluate(&account.expires_at, now);
        match remaining.status {
            ExpiryStatus::Expired => summary.expired += 1,
            ExpiryStatus::Expiring => summary.expiring += 1,
            ExpiryStatus::Normal | ExpiryStatus::Unknown => {}
        }

        let position = (index + 1).to_string();
        let name = if account.name.is_empty() {
            UNKNOWN_NAME
        } else {
            account.name.as_str()
        };
        let key = truncate_key(&account.api_key);
        let expires = if account.expires_at.is_empty() {
            "unknown"
        } else {
            account.expires_at.as_str()
        };

        deps.ui.print_styled(
            &row([&position, name, &key, expires, &remaining.description]),
            row_style(remaining.status),
        );
    }

    deps.ui.print_styled(&border(), MessageStyle::Cyan);

    if summary.expired > 0 || summary.expiring > 0 {
        deps.ui.print_styled(
            &format!(
                "{} expired, {} expiring within a day",
                summary.expired, summary.expiring
            ),
            MessageStyle::Warning,
        );
    }

    summary
}

/// Print the roster table with production dependencies
pub fn execute(settings: &Settings) -> Result<()> {
    let deps = MenuDependencies::production(settings)?;
    let roster = deps.load_roster(settings)?;
    execute_with_deps(&roster, &deps.list_deps());
    Ok(())
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
