//! Shared helpers for `fieldsync-infra` integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fieldsync_core::{KeyValueStore, RemoteApi, SystemClock};
use fieldsync_domain::{ApiConfig, Config, ConnectivityStatus, SyncConfig};
use fieldsync_infra::{RestApiClient, SqliteStore, SyncContext, WatchConnectivity};
use tempfile::TempDir;
use wiremock::MockServer;

/// SQLite store in a temporary directory that lives as long as the value.
pub struct TestStore {
    pub store: Arc<SqliteStore>,
    pub dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir created");
        let store = Arc::new(SqliteStore::open_path(dir.path().join("fieldsync.db")).expect("store"));
        Self { store, dir }
    }

    /// Open a second handle on the same database file, as a restarted
    /// process would.
    pub fn reopen(&self) -> Arc<SqliteStore> {
        Arc::new(SqliteStore::open_path(self.dir.path().join("fieldsync.db")).expect("store reopened"))
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Sync settings that keep real-time tests fast.
pub fn fast_sync_config() -> SyncConfig {
    SyncConfig {
        backoff_base_ms: 1,
        backoff_cap_ms: 5,
        inter_operation_pause_ms: 0,
        operation_timeout_ms: Some(2_000),
        ..SyncConfig::default()
    }
}

pub fn api_for(server: &MockServer) -> RestApiClient {
    RestApiClient::new(&ApiConfig {
        base_url: server.uri(),
        auth_token: Some("test-token".into()),
        ..ApiConfig::default()
    })
    .expect("api client")
}

/// Context over a temp SQLite store, a wiremock backend and a host-fed
/// connectivity monitor.
pub struct TestContext {
    pub ctx: SyncContext,
    pub connectivity: Arc<WatchConnectivity>,
    pub store: TestStore,
}

impl TestContext {
    pub fn new(server: &MockServer, online: bool, sync: SyncConfig) -> Self {
        let store = TestStore::new();
        let connectivity = Arc::new(WatchConnectivity::new(if online {
            ConnectivityStatus::online("wifi")
        } else {
            ConnectivityStatus::offline()
        }));
        let api: Arc<dyn RemoteApi> = Arc::new(api_for(server));
        let kv: Arc<dyn KeyValueStore> = store.store.clone();
        let config = Config { sync, ..Config::default() };

        let ctx = SyncContext::from_parts(config, kv, api, connectivity.clone(), Arc::new(SystemClock));
        Self { ctx, connectivity, store }
    }
}

/// Poll `check` until it returns true or five seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
