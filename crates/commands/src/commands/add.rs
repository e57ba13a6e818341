//! Add an account from its session token

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use flowkeys_runtime::deps::{MessageStyle, UserInterface};

use crate::store::{Credential, CredentialStore, Roster};
use crate::upstream::CredentialSource;

/// Dependencies for the add command
pub struct AddDependencies {
    /// User interface for prompts and output
    pub ui: Arc<dyn UserInterface>,
    /// Roster persistence
    pub store: CredentialStore,
    /// Upstream lookups
    pub source: Arc<dyn CredentialSource>,
}

/// Prompt for a session token, resolve the account, and append it to
/// `roster`. Returns whether an account was added.
pub async fn execute_with_deps(roster: &mut Roster, deps: &AddDependencies) -> Result<bool> {
    deps.ui.print_styled(
        "Paste the BXAuth cookie (browser dev tools → Application → Cookies → BXAuth)",
        MessageStyle::Cyan,
    );
    let token = deps.ui.prompt_input("BXAuth", None)?;
    if token.is_empty() {
        deps.ui
            .print_styled("BXAuth cannot be empty", MessageStyle::Error);
        return Ok(false);
    }

    let spinner = deps.ui.create_spinner();
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Resolving account name...");
    let name = deps.source.resolve_display_name(&token).await;
    spinner.set_message("Requesting API key...");
    let info = deps.source.resolve_key_info(&token).await;
    spinner.finish_and_clear();

    let Some(info) = info else {
        deps.ui
            .print_styled("Failed to obtain an API key", MessageStyle::Error);
        return Ok(false);
    };

    roster.add(Credential::new(token, name.as_str(), info));
    deps.store
        .save(roster)
        .context("Failed to save the new account")?;

    deps.ui
        .print_styled(&format!("✅ Added: {name}"), MessageStyle::Success);
    Ok(true)
}

#[cfg(test)]
#[path = "add_tests.rs"]
mod tests;
