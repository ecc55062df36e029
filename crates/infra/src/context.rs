//! Composition root
//!
//! Builds the store, API client, queue and orchestrator from a [`Config`]
//! and hands out the shared handles.

use std::sync::Arc;

use fieldsync_core::{
    Clock, ConnectivityMonitor, KeyValueStore, MutationQueue, RemoteApi, SyncOrchestrator,
    SystemClock,
};
use fieldsync_domain::{Config, Result, SyncState};
use tracing::debug;

use crate::api::RestApiClient;
use crate::storage::SqliteStore;
use crate::sync::{AutoSyncConfig, AutoSyncWorker};

/// Shared handles for one running sync engine.
#[derive(Clone)]
pub struct SyncContext {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    queue: Arc<MutationQueue>,
    orchestrator: Arc<SyncOrchestrator>,
}

impl SyncContext {
    /// Validate `config`, open the SQLite store and build the REST client.
    ///
    /// # Errors
    /// Configuration, storage or HTTP client construction failures.
    pub fn build(config: Config, connectivity: Arc<dyn ConnectivityMonitor>) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&config.storage)?);
        let api: Arc<dyn RemoteApi> = Arc::new(RestApiClient::new(&config.api)?);
        Ok(Self::from_parts(config, store, api, connectivity, Arc::new(SystemClock)))
    }

    /// Assemble a context from already-built adapters.
    pub fn from_parts(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        api: Arc<dyn RemoteApi>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let queue = Arc::new(MutationQueue::new(Arc::clone(&store), Arc::clone(&clock), config.queue));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            Arc::clone(&queue),
            api,
            Arc::clone(&connectivity),
            Arc::clone(&store),
            clock,
            config.sync.clone(),
        ));

        Self { config, store, connectivity, queue, orchestrator }
    }

    /// Clear state left behind by a process that died mid-drain.
    ///
    /// # Errors
    /// Storage failures while reading or resetting the markers.
    pub async fn recover(&self) -> Result<Option<SyncState>> {
        let stale = self.orchestrator.recover_interrupted().await?;
        if stale.is_none() {
            debug!("no interrupted sync found");
        }
        Ok(stale)
    }

    /// A worker that syncs on reconnect and on the configured interval. It is
    /// returned stopped.
    pub fn auto_sync_worker(&self) -> AutoSyncWorker {
        AutoSyncWorker::new(
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.connectivity),
            AutoSyncConfig::from(&self.config.sync),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<MutationQueue> {
        &self.queue
    }

    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.orchestrator
    }
}
