//! Integration tests for the auto-sync worker and connectivity adapters

mod support;

use std::time::Duration;

use fieldsync_core::ConnectivityMonitor;
use fieldsync_domain::{ConnectivityStatus, NewOperation, SyncConfig, SyncState};
use fieldsync_infra::{ProbeConfig, ProbeConnectivity, WorkerError};
use serde_json::json;
use support::{eventually, fast_sync_config, TestContext};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_backend(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/sales"))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

async fn post_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .count()
}

#[tokio::test]
async fn reconnect_triggers_a_full_sync() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    let t = TestContext::new(&server, false, fast_sync_config());
    t.ctx.queue().enqueue(NewOperation::create("/sales", json!({"total": 1}))).await.unwrap();

    let mut worker = t.ctx.auto_sync_worker();
    worker.start().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(post_count(&server).await, 0, "offline worker must not sync");

    t.connectivity.update(ConnectivityStatus::online("wifi"));

    let queue = t.ctx.queue().clone();
    assert!(
        eventually(|| {
            let queue = queue.clone();
            async move { queue.list_pending().await.unwrap().is_empty() }
        })
        .await,
        "queue should drain after reconnect"
    );
    assert_eq!(post_count(&server).await, 1);

    worker.stop().await.unwrap();
    assert!(!worker.is_running());
}

#[tokio::test]
async fn staying_online_does_not_resync() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    let t = TestContext::new(&server, true, fast_sync_config());
    t.ctx.queue().enqueue(NewOperation::create("/sales", json!({"total": 2}))).await.unwrap();

    let mut worker = t.ctx.auto_sync_worker();
    worker.start().unwrap();

    // A transport change is not an offline to online transition.
    t.connectivity.update(ConnectivityStatus::online("cellular"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(post_count(&server).await, 0);
    assert_eq!(t.ctx.queue().list_pending().await.unwrap().len(), 1);
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn reconnect_sync_can_be_disabled() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    let config = SyncConfig { auto_sync_on_reconnect: false, ..fast_sync_config() };
    let t = TestContext::new(&server, false, config);
    t.ctx.queue().enqueue(NewOperation::create("/sales", json!({"total": 3}))).await.unwrap();

    let mut worker = t.ctx.auto_sync_worker();
    worker.start().unwrap();
    t.connectivity.update(ConnectivityStatus::online("wifi"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(post_count(&server).await, 0);
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn periodic_tick_syncs_while_online() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    let config = SyncConfig { periodic_interval_seconds: Some(1), ..fast_sync_config() };
    let t = TestContext::new(&server, true, config);
    t.ctx.queue().enqueue(NewOperation::create("/sales", json!({"total": 4}))).await.unwrap();

    let mut worker = t.ctx.auto_sync_worker();
    worker.start().unwrap();

    let queue = t.ctx.queue().clone();
    assert!(
        eventually(|| {
            let queue = queue.clone();
            async move { queue.list_pending().await.unwrap().is_empty() }
        })
        .await
    );
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn stop_mid_drain_records_the_call_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let t = TestContext::new(&server, false, fast_sync_config());
    t.ctx.queue().enqueue(NewOperation::create("/sales/1", json!({"total": 1}))).await.unwrap();
    t.ctx.queue().enqueue(NewOperation::create("/sales/2", json!({"total": 2}))).await.unwrap();

    let mut worker = t.ctx.auto_sync_worker();
    worker.start().unwrap();
    t.connectivity.update(ConnectivityStatus::online("wifi"));

    let orchestrator = t.ctx.orchestrator().clone();
    let server_ref = &server;
    assert!(
        eventually(|| {
            let orchestrator = orchestrator.clone();
            async move { orchestrator.is_active() && post_count(server_ref).await == 1 }
        })
        .await,
        "first POST should be in flight"
    );

    worker.stop().await.expect("worker waits for the drain to wind down");

    assert!(!orchestrator.is_active());
    assert_eq!(post_count(&server).await, 1, "no operation starts after stop");
    let remaining: Vec<String> =
        t.ctx.queue().list_pending().await.unwrap().into_iter().map(|op| op.endpoint).collect();
    assert_eq!(remaining, vec!["/sales/2"], "accepted POST must be completed");
    assert!(!t.ctx.queue().is_processing().await.unwrap());
    assert_eq!(orchestrator.sync_state().await.unwrap(), SyncState::idle());

    let gets = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count();
    assert_eq!(gets, 0, "stopped sync skips the dataset pull");
}

#[tokio::test]
async fn lifecycle_errors() {
    let server = MockServer::start().await;
    let t = TestContext::new(&server, false, fast_sync_config());
    let mut worker = t.ctx.auto_sync_worker();

    assert!(matches!(worker.stop().await, Err(WorkerError::NotRunning)));
    worker.start().unwrap();
    assert!(matches!(worker.start(), Err(WorkerError::AlreadyRunning)));
    worker.stop().await.unwrap();
    worker.start().expect("restart after stop");
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn probe_reports_reachability_and_publishes_transitions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let probe = ProbeConnectivity::new(ProbeConfig::new(format!("{}/health", server.uri()))).unwrap();
    let mut rx = probe.subscribe();
    assert!(!rx.borrow_and_update().is_connected);

    let status = probe.fetch_status().await.unwrap();
    assert!(status.is_connected);
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_connected);

    drop(server);
    let status = probe.fetch_status().await.unwrap();
    assert!(!status.is_connected);
}

#[tokio::test]
async fn probe_polls_in_background() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let mut config = ProbeConfig::new(server.uri());
    config.interval = Duration::from_millis(50);
    let mut probe = ProbeConnectivity::new(config).unwrap();
    let mut rx = probe.subscribe();

    probe.start().unwrap();
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("probe publishes within timeout")
        .unwrap();
    assert!(rx.borrow().is_connected);

    probe.stop().await.unwrap();
    assert!(matches!(probe.stop().await, Err(WorkerError::NotRunning)));
}
