//! Interactive account menu
//!
//! Each cycle reloads the roster from disk, shows the table and the router
//! status, then runs one action. Ctrl-C at any prompt ends the session.

use std::sync::Arc;

use anyhow::{Context, Result};

use flowkeys_common::RealUserInterface;
use flowkeys_runtime::Settings;
use flowkeys_runtime::deps::{
    Clock, Environment, FileSystem, HttpClient, InputInterrupted, MessageStyle, RealClock,
    RealCommandExecutor, RealEnvironment, RealFileSystem, RealHttpClient, UserInterface,
};

use crate::commands::{add, delete, init, list, refresh, status, sync};
use crate::provision::RouterLayout;
use crate::router::{RouterRestarter, ShellRestarter};
use crate::store::{CredentialStore, Roster};
use crate::upstream::{CredentialSource, UpstreamClient};

const TITLE: &str = "📋 iFlow Accounts";
const FAREWELL: &str = "Goodbye! 🐱";

/// Every collaborator the menu and its actions need
#[derive(Clone)]
pub struct MenuDependencies {
    /// User interface for prompts and output
    pub ui: Arc<dyn UserInterface>,
    /// Clock used to evaluate expiry
    pub clock: Arc<dyn Clock>,
    /// File system for the roster and router files
    pub file_system: Arc<dyn FileSystem>,
    /// Platform and login name
    pub environment: Arc<dyn Environment>,
    /// Client used to download router templates
    pub http_client: Arc<dyn HttpClient>,
    /// Upstream account lookups
    pub source: Arc<dyn CredentialSource>,
    /// Restarts the router after a sync
    pub restarter: Arc<dyn RouterRestarter>,
}

impl MenuDependencies {
    /// Production collaborators for `settings`
    pub fn production(settings: &Settings) -> Result<Self> {
        Ok(Self {
            ui: Arc::new(RealUserInterface),
            clock: Arc::new(RealClock),
            file_system: Arc::new(RealFileSystem),
            environment: Arc::new(RealEnvironment),
            http_client: Arc::new(RealHttpClient::new()?),
            source: Arc::new(UpstreamClient::new(settings.api_base_url.as_str())?),
            restarter: Arc::new(ShellRestarter::new(Arc::new(RealCommandExecutor))),
        })
    }

    /// Load the roster at the configured path
    pub fn load_roster(&self, settings: &Settings) -> Result<Roster> {
        let store = self.store(settings);
        store
            .load()
            .with_context(|| format!("Failed to load accounts from {}", store.path().display()))
    }

    /// Roster store at the configured path
    pub fn store(&self, settings: &Settings) -> CredentialStore {
        CredentialStore::new(settings.store_path.clone(), self.file_system.clone())
    }

    /// Dependencies for the roster table
    pub fn list_deps(&self) -> list::ListDependencies {
        list::ListDependencies {
            ui: self.ui.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Dependencies for adding an account
    pub fn add_deps(&self, settings: &Settings) -> add::AddDependencies {
        add::AddDependencies {
            ui: self.ui.clone(),
            store: self.store(settings),
            source: self.source.clone(),
        }
    }

    /// Dependencies for refreshing keys
    pub fn refresh_deps(&self, settings: &Settings) -> refresh::RefreshDependencies {
        refresh::RefreshDependencies {
            ui: self.ui.clone(),
            clock: self.clock.clone(),
            store: self.store(settings),
            source: self.source.clone(),
        }
    }

    /// Dependencies for deleting an account
    pub fn delete_deps(&self, settings: &Settings) -> delete::DeleteDependencies {
        delete::DeleteDependencies {
            ui: self.ui.clone(),
            store: self.store(settings),
        }
    }

    /// Dependencies for syncing the router config
    pub fn sync_deps(&self) -> sync::SyncDependencies {
        sync::SyncDependencies {
            ui: self.ui.clone(),
            file_system: self.file_system.clone(),
            restarter: self.restarter.clone(),
        }
    }

    /// Dependencies for provisioning the router
    pub fn init_deps(&self) -> init::InitDependencies {
        init::InitDependencies {
            ui: self.ui.clone(),
            file_system: self.file_system.clone(),
            http_client: self.http_client.clone(),
            environment: self.environment.clone(),
        }
    }

    fn status_deps(&self) -> status::StatusDependencies {
        status::StatusDependencies {
            ui: self.ui.clone(),
            file_system: self.file_system.clone(),
        }
    }
}

/// Menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// Add an account
    Add,
    /// Refresh expired and expiring keys
    SmartRefresh,
    /// Refresh every key
    ForceRefresh,
    /// Delete an account; offered only when the roster is not empty
    Delete,
    /// Publish keys to the router
    Sync,
    /// Provision the router files
    Init,
    /// Leave the menu
    Exit,
}

impl MenuChoice {
    const ALL: [Self; 7] = [
        Self::Add,
        Self::SmartRefresh,
        Self::ForceRefresh,
        Self::Delete,
        Self::Sync,
        Self::Init,
        Self::Exit,
    ];

    /// Key the user types
    pub const fn key(self) -> &'static str {
        match self {
            Self::Add => "1",
            Self::SmartRefresh => "2",
            Self::ForceRefresh => "3",
            Self::Delete => "4",
            Self::Sync => "5",
            Self::Init => "6",
            Self::Exit => "7",
        }
    }

    /// Label shown next to the key
    pub const fn label(self) -> &'static str {
        match self {
            Self::Add => "➕ Add account",
            Self::SmartRefresh => "🔄 Smart refresh",
            Self::ForceRefresh => "⚡ Refresh all",
            Self::Delete => "🗑️ Delete account",
            Self::Sync => "⚙️ Sync router config",
            Self::Init => "🔧 Initialize router config",
            Self::Exit => "🚪 Exit",
        }
    }

    /// Entries offered for a roster with `accounts` credentials
    pub fn available(accounts: usize) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|choice| *choice != Self::Delete || accounts > 0)
            .collect()
    }

    /// Entries offered while the roster file cannot be read; none of them
    /// write the roster
    pub fn without_roster() -> Vec<Self> {
        vec![Self::Init, Self::Exit]
    }

    /// Match typed input against the offered entries
    pub fn parse(input: &str, offered: &[Self]) -> Option<Self> {
        offered
            .iter()
            .copied()
            .find(|choice| choice.key() == input.trim())
    }
}

fn is_interrupt(error: &anyhow::Error) -> bool {
    error.downcast_ref::<InputInterrupted>().is_some()
}

fn print_title(ui: &dyn UserInterface) {
    let width = console::measure_text_width(TITLE) + 8;
    let border = format!("+{}+", "-".repeat(width));
    ui.print("");
    ui.print_styled(&border, MessageStyle::Cyan);
    ui.print_styled(
        &format!(
            "|{}|",
            console::pad_str(TITLE, width, console::Alignment::Center, None)
        ),
        MessageStyle::Cyan,
    );
    ui.print_styled(&border, MessageStyle::Cyan);
}

fn prompt_choice(ui: &dyn UserInterface, offered: &[MenuChoice]) -> Result<MenuChoice> {
    loop {
        let answer = ui.prompt_input("Choose an option", None)?;
        if let Some(choice) = MenuChoice::parse(&answer, offered) {
            return Ok(choice);
        }
        ui.print_styled("Invalid option, please try again", MessageStyle::Error);
    }
}

/// Publish the roster to the router config named by `settings`
pub async fn sync_roster(roster: &Roster, settings: &Settings, deps: &MenuDependencies) -> bool {
    match settings.router_config_path() {
        Ok(path) => sync::execute_with_deps(roster, &path, &deps.sync_deps()).await,
        Err(e) => {
            deps.ui
                .print_styled(&format!("⚠️ {e:#}"), MessageStyle::Warning);
            false
        }
    }
}

async fn auto_sync(roster: &Roster, settings: &Settings, deps: &MenuDependencies) {
    deps.ui
        .print_styled("Syncing router config...", MessageStyle::Cyan);
    sync_roster(roster, settings, deps).await;
}

fn show_status(settings: &Settings, deps: &MenuDependencies) {
    match RouterLayout::resolve(settings.router_home.as_deref(), deps.environment.as_ref()) {
        Ok(layout) => {
            status::execute_with_deps(deps.environment.platform(), &layout, &deps.status_deps());
        }
        Err(e) => tracing::warn!("Failed to locate the router directory: {e:#}"),
    }
}

/// Run one action. Returns `false` when the menu should end.
async fn run_choice(
    choice: MenuChoice,
    roster: &mut Roster,
    settings: &Settings,
    deps: &MenuDependencies,
) -> Result<bool> {
    match choice {
        MenuChoice::Add => {
            if add::execute_with_deps(roster, &deps.add_deps(settings)).await? {
                auto_sync(roster, settings, deps).await;
            }
        }
        MenuChoice::SmartRefresh | MenuChoice::ForceRefresh => {
            let mode = if choice == MenuChoice::SmartRefresh {
                refresh::RefreshMode::Smart
            } else {
                refresh::RefreshMode::Force
            };
            let report =
                refresh::execute_with_deps(roster, mode, false, &deps.refresh_deps(settings))
                    .await?;
            if report.refreshed > 0 {
                auto_sync(roster, settings, deps).await;
            }
        }
        MenuChoice::Delete => {
            if delete::execute_with_deps(roster, &deps.delete_deps(settings))? {
                auto_sync(roster, settings, deps).await;
            }
        }
        MenuChoice::Sync => {
            sync_roster(roster, settings, deps).await;
        }
        MenuChoice::Init => {
            init::execute_with_deps(roster, settings.router_home.as_deref(), &deps.init_deps())
                .await;
        }
        MenuChoice::Exit => return Ok(false),
    }
    Ok(true)
}

/// Run the interactive menu until the user exits or presses Ctrl-C.
///
/// An unreadable roster file is reported on every cycle and is never
/// overwritten; only the actions that leave it alone are offered.
pub async fn execute_with_deps(settings: &Settings, deps: &MenuDependencies) -> Result<()> {
    loop {
        print_title(deps.ui.as_ref());
        let (mut roster, offered) = match deps.load_roster(settings) {
            Ok(roster) => {
                list::execute_with_deps(&roster, &deps.list_deps());
                let offered = MenuChoice::available(roster.len());
                (roster, offered)
            }
            Err(e) => {
                tracing::warn!("roster unavailable: {e:?}");
                deps.ui
                    .print_styled(&format!("❌ {e:#}"), MessageStyle::Error);
                deps.ui.print_styled(
                    "Fix or remove the file to manage accounts",
                    MessageStyle::Warning,
                );
                (Roster::default(), MenuChoice::without_roster())
            }
        };
        deps.ui.print("");
        show_status(settings, deps);

        deps.ui.print("");
        for choice in &offered {
            deps.ui
                .print(&format!("  [{}] {}", choice.key(), choice.label()));
        }

        let choice = match prompt_choice(deps.ui.as_ref(), &offered) {
            Ok(choice) => choice,
            Err(e) if is_interrupt(&e) => break,
            Err(e) => return Err(e),
        };

        match run_choice(choice, &mut roster, settings, deps).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if is_interrupt(&e) => break,
            Err(e) => {
                tracing::debug!("menu action failed: {e:?}");
                deps.ui
                    .print_styled(&format!("❌ {e:#}"), MessageStyle::Error);
            }
        }
    }

    deps.ui.print_styled(FAREWELL, MessageStyle::Cyan);
    Ok(())
}

/// Run the interactive menu with production dependencies
pub async fn execute(settings: Settings) -> Result<()> {
    let deps = MenuDependencies::production(&settings)?;
    execute_with_deps(&settings, &deps).await
}

#[cfg(test)]
#[path = "menu_tests.rs"]
mod tests;
