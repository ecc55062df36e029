//! Connectivity monitor driven by the test

use async_trait::async_trait;
use fieldsync_core::ConnectivityMonitor;
use fieldsync_domain::{ConnectivityStatus, Result as DomainResult};
use tokio::sync::watch;

pub struct FakeConnectivity {
    tx: watch::Sender<ConnectivityStatus>,
}

impl FakeConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(status(online));
        Self { tx }
    }

    pub fn set_online(&self, online: bool) {
        self.tx.send_replace(status(online));
    }
}

fn status(online: bool) -> ConnectivityStatus {
    if online {
        ConnectivityStatus::online("wifi")
    } else {
        ConnectivityStatus::offline()
    }
}

#[async_trait]
impl ConnectivityMonitor for FakeConnectivity {
    async fn fetch_status(&self) -> DomainResult<ConnectivityStatus> {
        Ok(self.tx.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.tx.subscribe()
    }
}
