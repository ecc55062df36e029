//! Shared test helpers for `fieldsync-core` integration tests.
//!
//! In-memory doubles for every core port plus a [`Harness`] that wires them
//! into a queue and an orchestrator.

#![allow(dead_code)]

pub mod api;
pub mod connectivity;
pub mod store;

use std::sync::Arc;

use fieldsync_core::{MockClock, MutationQueue, SyncOrchestrator};
use fieldsync_domain::{QueueConfig, SyncConfig};

pub use api::{RecordedCall, ScriptedApi};
pub use connectivity::FakeConnectivity;
pub use store::InMemoryStore;

/// Fixed starting point for the mock clock.
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// Fully wired queue and orchestrator over in-memory ports.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub api: Arc<ScriptedApi>,
    pub connectivity: Arc<FakeConnectivity>,
    pub clock: MockClock,
    pub queue: Arc<MutationQueue>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl Harness {
    pub fn online() -> Self {
        Self::build(true, SyncConfig::default())
    }

    pub fn offline() -> Self {
        Self::build(false, SyncConfig::default())
    }

    pub fn with_sync_config(online: bool, config: SyncConfig) -> Self {
        Self::build(online, config)
    }

    fn build(online: bool, sync_config: SyncConfig) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let api = Arc::new(ScriptedApi::default());
        let connectivity = Arc::new(FakeConnectivity::new(online));
        let clock = MockClock::at_millis(START_MILLIS);

        let queue = Arc::new(MutationQueue::new(
            store.clone(),
            Arc::new(clock.clone()),
            QueueConfig::default(),
        ));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            Arc::clone(&queue),
            api.clone(),
            connectivity.clone(),
            store.clone(),
            Arc::new(clock.clone()),
            sync_config,
        ));

        Self { store, api, connectivity, clock, queue, orchestrator }
    }
}
