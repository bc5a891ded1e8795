//! # orderdesk
//!
//! Command-line client for the order desk: customers, products and orders
//! mirrored from the local document store by the sync engine.
//!
//! Every invocation opens the store, starts the engine (subscriptions first,
//! then the first page of each collection), runs one command and shuts the
//! engine down again. `watch` keeps the engine running and prints view events
//! until interrupted.

mod cli;
mod commands;
mod config;
mod state;
mod table;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::ClientConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var), on stderr so that
    //    tables on stdout stay clean
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,orderdesk_client=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Load configuration, command-line flags win over the environment
    // -----------------------------------------------------------------------
    let mut config = ClientConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }
    if let Some(page_size) = cli.page_size {
        config.sync.page_size = page_size;
    }
    debug!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Start the engine and run the command
    // -----------------------------------------------------------------------
    let state = AppState::open(&config).await?;

    let result = match cli.command {
        Command::Customers { command } => commands::customers::run(&state, command).await,
        Command::Products { command } => commands::products::run(&state, command).await,
        Command::Orders { command } => commands::orders::run(&state, command).await,
        Command::Watch { view, json } => commands::watch::run(&state, view.into(), json).await,
    };

    state.close().await;
    info!("orderdesk v{} done", env!("CARGO_PKG_VERSION"));
    result
}
