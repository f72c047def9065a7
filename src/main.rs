mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize structured logging
    let level = cli
        .command
        .common()
        .map(commands::log_level)
        .unwrap_or_else(|| "info".to_string());
    scriptcache::logging::init(&level);

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Require(args) => commands::require::run(&args).await,
        Commands::Cache(args) => commands::cache::run(&args).await,
        Commands::Config(args) => commands::config::run(args.command),
    }
}
