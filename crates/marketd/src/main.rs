//! Market-data aggregation daemon — entry point.

use anyhow::Result;
use clap::{Parser, Subcommand};
use marketd::{AppConfig, DaemonState, Manager};
use marketd_store::Store;
use std::sync::Arc;
use tracing::{error, info};

/// Multi-venue market-data aggregation daemon.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file path (also via MARKETD_CONFIG env var).
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the pipeline and run until interrupted.
    Start,
    /// Clear the persisted active flag.
    Stop,
    /// Report whether the daemon is marked active.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = AppConfig::resolve_path(cli.config);
    let config = AppConfig::from_file(&config_path)?;

    marketd::logging::init_logging(&config.logging.level);
    info!(config_path = %config_path, config = ?config.masked(), "configuration loaded");

    match cli.command {
        Command::Start => start(config).await,
        Command::Stop => {
            DaemonState::set_active(&config.daemon.state_file, false);
            println!("stopped");
            Ok(())
        }
        Command::Status => {
            let state = DaemonState::load(&config.daemon.state_file);
            println!("{}", if state.active { "active" } else { "inactive" });
            Ok(())
        }
    }
}

async fn start(config: AppConfig) -> Result<()> {
    // TLS provider must be installed before the first venue connection.
    marketd_ws::init_crypto();

    let state = DaemonState::load(&config.daemon.state_file);
    if state.active {
        anyhow::bail!("daemon already active (state file {})", config.daemon.state_file);
    }

    info!("marketd v{} starting", env!("CARGO_PKG_VERSION"));
    let store = Arc::new(Store::connect(&config.database).await?);

    let state_file = config.daemon.state_file.clone();
    let mut manager = Manager::new(config, store);
    let result = manager.run().await;

    if let Err(e) = &result {
        // Best-effort state flush on the failure path.
        error!(error = %e, "daemon exiting on error");
        DaemonState::set_active(&state_file, false);
    }
    result.map_err(Into::into)
}
