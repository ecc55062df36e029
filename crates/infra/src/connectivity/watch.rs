//! Connectivity monitor backed by a `tokio::sync::watch` channel.

use async_trait::async_trait;
use fieldsync_core::ConnectivityMonitor;
use fieldsync_domain::{ConnectivityStatus, Result};
use tokio::sync::watch;
use tracing::info;

/// Holds the latest known status and notifies subscribers on change.
#[derive(Debug)]
pub struct WatchConnectivity {
    sender: watch::Sender<ConnectivityStatus>,
}

impl WatchConnectivity {
    pub fn new(initial: ConnectivityStatus) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Publish a new status. Subscribers are only woken when it differs from
    /// the current one; returns whether it did.
    pub fn update(&self, status: ConnectivityStatus) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status.clone();
            true
        });
        if changed {
            info!(
                is_connected = status.is_connected,
                connection_type = %status.connection_type,
                "connectivity changed"
            );
        }
        changed
    }

    pub fn current(&self) -> ConnectivityStatus {
        self.sender.borrow().clone()
    }
}

impl Default for WatchConnectivity {
    fn default() -> Self {
        Self::new(ConnectivityStatus::offline())
    }
}

#[async_trait]
impl ConnectivityMonitor for WatchConnectivity {
    async fn fetch_status(&self) -> Result<ConnectivityStatus> {
        Ok(self.current())
    }

    fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.sender.subscribe()
    }
}
