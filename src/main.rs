use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod canvas;
mod commands;
mod config;
mod db;
mod models;
mod sync;

use commands::{ConfigCommand, GarmentCommand, OutfitCommand, SyncCommand};
use config::Config;
use db::init_db;
use sync::{check_server, Connectivity, HttpRemote, SyncService};

#[derive(Parser)]
#[command(name = "lookbook")]
#[command(version)]
#[command(about = "An offline-first outfit planning CLI", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the closet
    Garment(GarmentCommand),

    /// Compose dated outfits on the canvas
    Outfit(OutfitCommand),

    /// Reconcile the local store with the sync server
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lookbook=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Garment(cmd)) => {
            let (service, _connectivity) = build_service(&config).await?;
            cmd.run(&service, &config).await?;
            auto_sync(&service, &config).await;
            service.close().await;
        }
        Some(Commands::Outfit(cmd)) => {
            let (service, _connectivity) = build_service(&config).await?;
            cmd.run(&service, &config).await?;
            auto_sync(&service, &config).await;
            service.close().await;
        }
        Some(Commands::Sync(cmd)) => {
            let (service, connectivity) = build_service(&config).await?;
            cmd.run(&service, &connectivity, &config).await?;
            service.close().await;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

/// Builds the service stack: database pool, remote client, and the
/// connectivity signal seeded by a one-shot reachability probe.
async fn build_service(
    config: &Config,
) -> Result<(Arc<SyncService>, Arc<Connectivity>), Box<dyn std::error::Error>> {
    let pool = init_db(Some(config.database_path.clone())).await?;

    let server_url = config.sync.server_url.clone().unwrap_or_default();
    let api_key = config.sync.api_key.clone().unwrap_or_default();

    let online = config.sync.is_configured() && check_server(&server_url).await;
    let connectivity = Arc::new(Connectivity::new(online));

    let remote = Arc::new(HttpRemote::new(server_url, api_key)?);
    let service = Arc::new(SyncService::new(
        pool,
        remote,
        connectivity.subscribe(),
    ));

    Ok((service, connectivity))
}

/// Drains the pending-change ledger after a mutating command when
/// auto-sync is enabled. Failures are logged, never surfaced.
async fn auto_sync(service: &Arc<SyncService>, config: &Config) {
    if !config.sync.auto_sync || !config.sync.is_configured() {
        return;
    }
    match service.synchronize(&config.owner_id).await {
        Ok(report) if !report.offline => {
            tracing::debug!(pushed = report.pushed, pulled = report.pulled, "auto-sync done");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("auto-sync failed: {}", e),
    }
}
