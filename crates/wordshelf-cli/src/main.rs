//! wordshelf CLI - keep a vocabulary notebook from the terminal
//!
//! Every command writes to the local cache first; `wordshelf sync` pushes the
//! queued changes when a backend is configured.

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, SyncCommands};
use crate::commands::book::run_book;
use crate::commands::common::{resolve_config_path, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::reset::run_reset;
use crate::commands::status::run_status;
use crate::commands::sync::{run_sync, run_sync_conflicts};
use crate::commands::word::run_word;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wordshelf=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path)?;
    let config_path = resolve_config_path(cli.config_path)?;

    match cli.command {
        Commands::Book { command } => run_book(command, &db_path, &config_path).await?,
        Commands::Word { command } => run_word(command, &db_path, &config_path).await?,
        Commands::Status { verbose } => run_status(verbose, &db_path).await?,
        Commands::Sync { command: None } => run_sync(&db_path, &config_path).await?,
        Commands::Sync {
            command: Some(SyncCommands::Conflicts { limit, json }),
        } => run_sync_conflicts(limit, json, &db_path).await?,
        Commands::Config { command } => run_config(command, &config_path)?,
        Commands::Reset { yes } => run_reset(yes, &db_path).await?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
