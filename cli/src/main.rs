//! flowkeys - manage iFlow accounts and keep claude-code-router in sync

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use flowkeys_common::RealUserInterface;
use flowkeys_runtime::{API_URL_ENV_VAR, ROUTER_HOME_ENV_VAR, STORE_PATH_ENV_VAR, Settings};
use flowkeys_runtime::deps::{MessageStyle, UserInterface};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Runs the interactive menu when omitted
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Path of the account roster file
    #[arg(long, global = true, env = STORE_PATH_ENV_VAR, value_name = "PATH")]
    store: Option<PathBuf>,
    /// Router directory (defaults to ~/.claude-code-router)
    #[arg(long, global = true, env = ROUTER_HOME_ENV_VAR, value_name = "DIR")]
    router_home: Option<PathBuf>,
    /// Base URL of the iFlow platform API
    #[arg(long, global = true, env = API_URL_ENV_VAR, value_name = "URL")]
    api_url: Option<String>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the account table
    List,
    /// Renew expired and expiring API keys
    Refresh(RefreshArgs),
    /// Write the roster's keys to the router config and restart it
    Sync,
    /// Download router templates and write a fresh router config
    Init,
}

#[derive(Debug, Args)]
struct RefreshArgs {
    /// Refresh every account, not only the due ones
    #[arg(short, long)]
    force: bool,
    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

impl From<RefreshArgs> for flowkeys_commands::refresh::RefreshArgs {
    fn from(args: RefreshArgs) -> Self {
        Self {
            force: args.force,
            yes: args.yes,
        }
    }
}

async fn run(command: Option<Commands>, settings: Settings) -> Result<()> {
    match command {
        None => flowkeys_commands::menu::execute(settings).await,
        Some(Commands::List) => flowkeys_commands::list::execute(&settings),
        Some(Commands::Refresh(args)) => {
            flowkeys_commands::refresh::execute(&settings, args.into()).await
        }
        Some(Commands::Sync) => flowkeys_commands::sync::execute(&settings).await,
        Some(Commands::Init) => flowkeys_commands::init::execute(&settings).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.global.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let settings = Settings::resolve(cli.global.store, cli.global.router_home, cli.global.api_url)?;
    tracing::debug!(store = %settings.store_path.display(), "starting");

    // Prompts see Ctrl-C as input; this covers network and subprocess waits.
    tokio::select! {
        result = run(cli.command, settings) => result,
        _ = tokio::signal::ctrl_c() => {
            let ui = RealUserInterface;
            ui.print("");
            ui.print_styled("Goodbye! 🐱", MessageStyle::Cyan);
            Ok(())
        }
    }
}
