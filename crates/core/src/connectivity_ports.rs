//! Connectivity monitor port

use async_trait::async_trait;
use fieldsync_domain::{ConnectivityStatus, Result};
use tokio::sync::watch;

/// Reports whether the device can reach the network.
#[async_trait]
pub trait ConnectivityMonitor: Send + Sync {
    /// One-shot poll of the current status.
    async fn fetch_status(&self) -> Result<ConnectivityStatus>;

    /// Receiver that observes every status transition.
    fn subscribe(&self) -> watch::Receiver<ConnectivityStatus>;
}
