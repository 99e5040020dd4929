//! wheelhouse CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wheelhouse_cli::{Cli, Commands, cmd, default_log_filter};
use wheelhouse_core::TerminalReporter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise -v picks the level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let reporter = TerminalReporter::new();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Index(args) => cmd::index::index(args, config, &reporter).await,
        Commands::Sync(args) => cmd::sync::sync(args, config, &reporter).await,
    }
}
