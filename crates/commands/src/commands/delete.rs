//! Remove an account from the roster

use std::sync::Arc;

use anyhow::{Context, Result};

use flowkeys_runtime::deps::{MessageStyle, UserInterface};

use crate::store::{CredentialStore, Roster};
use crate::upstream::UNKNOWN_NAME;

/// Dependencies for the delete command
pub struct DeleteDependencies {
    /// User interface for prompts and output
    pub ui: Arc<dyn UserInterface>,
    /// Roster persistence
    pub store: CredentialStore,
}

/// Ask for a 1-based position and remove that account after confirmation.
///
/// Input that is not a position in the roster abandons the deletion
/// silently. Returns whether an account was removed.
pub fn execute_with_deps(roster: &mut Roster, deps: &DeleteDependencies) -> Result<bool> {
    if roster.is_empty() {
        return Ok(false);
    }

    deps.ui
        .print_styled("Select the account to delete:", MessageStyle::Bold);
    for (index, account) in roster.accounts.iter().enumerate() {
        let name = if account.name.is_empty() {
            UNKNOWN_NAME
        } else {
            &account.name
        };
        deps.ui.print(&format!("  {}. {name}", index + 1));
    }

    let answer = deps.ui.prompt_input("Number", None)?;
    let Some(index) = answer
        .parse::<usize>()
        .ok()
        .and_then(|position| position.checked_sub(1))
        .filter(|index| *index < roster.len())
    else {
        tracing::debug!(answer = %answer, "deletion abandoned");
        return Ok(false);
    };

    let name = match roster.accounts[index].name.as_str() {
        "" => UNKNOWN_NAME.to_string(),
        name => name.to_string(),
    };
    if !deps
        .ui
        .prompt_confirm(&format!("Delete {name}?"), false)?
    {
        return Ok(false);
    }

    roster.remove_at(index);
    deps.store
        .save(roster)
        .context("Failed to save the roster after deletion")?;
    deps.ui.print_styled("✅ Deleted", MessageStyle::Success);
    Ok(true)
}

#[cfg(test)]
#[path = "delete_tests.rs"]
mod tests;
