//! Sync CLI commands for reconciling with the server.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::config::Config;
use crate::sync::{check_server, spawn_probe, Connectivity, StoreEvent, SyncService};

/// Sync with remote server
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and server status
    Status,

    /// Re-fetch the owner's garments and outfits from the server
    Refresh,

    /// Keep syncing in the background until interrupted
    Watch,
}

impl SyncCommand {
    pub async fn run(
        &self,
        service: &Arc<SyncService>,
        connectivity: &Arc<Connectivity>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync_once(service, config).await,
            Some(SyncSubcommand::Status) => self.status(service, config).await,
            Some(SyncSubcommand::Refresh) => self.refresh(service, config).await,
            Some(SyncSubcommand::Watch) => self.watch(service, connectivity, config).await,
        }
    }

    async fn refresh(
        &self,
        service: &Arc<SyncService>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !service.is_online() {
            println!("Server unreachable; refresh skipped.");
            return Ok(());
        }

        println!("Refreshing from server...");
        let applied = service.refresh_from_remote(&config.owner_id).await?;
        if applied == 0 {
            println!("Already up to date.");
        } else {
            println!("Applied {} record(s).", applied);
        }
        Ok(())
    }

    async fn sync_once(
        &self,
        service: &Arc<SyncService>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Syncing with server...");
        println!();

        let report = service.synchronize(&config.owner_id).await?;

        if report.offline {
            println!("Server unreachable; changes stay queued locally.");
            println!("Pending changes: {}", service.ledger().len().await?);
            return Ok(());
        }

        println!("  pulled:   {}", report.pulled);
        println!("  pushed:   {}", report.pushed);
        if report.deferred > 0 {
            println!("  deferred: {}", report.deferred);
        }
        if report.dropped > 0 {
            println!("  dropped:  {}", report.dropped);
        }
        println!();

        if report.pulled + report.pushed == 0 {
            println!("Already up to date.");
        } else {
            println!("Sync complete.");
        }
        Ok(())
    }

    async fn status(
        &self,
        service: &Arc<SyncService>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        if !config.sync.is_configured() {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"https://localhost:8080\"");
            println!("    api_key: \"your-api-key\"");
            println!("    auto_sync: true");
            println!();
            println!("Or set environment variables:");
            println!("  LOOKBOOK_SYNC_URL");
            println!("  LOOKBOOK_SYNC_API_KEY");
            return Ok(());
        }

        let server_url = config.sync.server_url.as_deref().unwrap_or_default();
        let api_key = config.sync.api_key.as_deref().unwrap_or_default();

        println!("Server:    {}", server_url);
        println!("API Key:   {}...", &api_key[..api_key.len().min(8)]);
        println!(
            "Auto-sync: {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("Pending:   {} queued change(s)", service.ledger().len().await?);
        println!();

        print!("Server status: ");
        if check_server(server_url).await {
            println!("✓ connected");
        } else {
            println!("✗ unreachable");
        }

        Ok(())
    }

    async fn watch(
        &self,
        service: &Arc<SyncService>,
        connectivity: &Arc<Connectivity>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let server_url = config
            .sync
            .server_url
            .clone()
            .ok_or("Sync is not configured; set sync.server_url first")?;

        let period = Duration::from_secs(config.sync.interval_secs);
        let probe = spawn_probe(Arc::clone(connectivity), server_url, period);
        let loop_handle = Arc::clone(service).spawn(&config.owner_id, period);

        println!(
            "Watching for changes every {}s; press Ctrl-C to stop.",
            config.sync.interval_secs
        );

        let mut events = service.subscribe();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => {
                    if let Ok(StoreEvent::Refreshed) = event {
                        println!("Local store refreshed from server.");
                    }
                }
            }
        }

        loop_handle.abort();
        probe.abort();
        println!("Stopped.");
        Ok(())
    }
}
