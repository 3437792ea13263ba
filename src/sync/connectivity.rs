use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::http_remote::check_server;

/// Shared online/offline signal.
///
/// The sync service holds a receiver; flipping the value to online wakes
/// its background loop for an immediate cycle.
pub struct Connectivity {
    tx: watch::Sender<bool>,
}

impl Connectivity {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn set_online(&self, online: bool) {
        self.tx.send_replace(online);
    }
}

/// Periodically probes the server's health endpoint and feeds the result
/// into the connectivity signal.
pub fn spawn_probe(
    connectivity: Arc<Connectivity>,
    base_url: String,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let online = check_server(&base_url).await;
            if online != connectivity.is_online() {
                tracing::info!(online, "connectivity changed");
            }
            connectivity.set_online(online);
        }
    })
}
