//! Connectivity derived from polling a health endpoint.
//!
//! Any HTTP response counts as reachable; connection failures and timeouts
//! count as offline. Results are published through a [`WatchConnectivity`] so
//! subscribers only see transitions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_core::ConnectivityMonitor;
use fieldsync_domain::{ConnectivityStatus, Result};
use reqwest::Method;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::watch::WatchConnectivity;
use crate::http::HttpClient;
use crate::sync::WorkerError;

/// Transport label published while the health endpoint answers.
const PROBE_TRANSPORT: &str = "network";

/// Configuration for the health probe.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// URL requested with `GET` on every poll
    pub health_url: String,
    /// Interval between polls
    pub interval: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl ProbeConfig {
    pub fn new(health_url: impl Into<String>) -> Self {
        Self {
            health_url: health_url.into(),
            interval: Duration::from_secs(15),
            request_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Polling connectivity monitor with explicit lifecycle management.
pub struct ProbeConnectivity {
    state: Arc<WatchConnectivity>,
    http: HttpClient,
    config: ProbeConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl ProbeConnectivity {
    /// Build a probe. The status starts offline until the first poll.
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let http = HttpClient::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            state: Arc::new(WatchConnectivity::default()),
            http,
            config,
            cancellation: CancellationToken::new(),
            task_handle: None,
        })
    }

    /// Poll once and publish the result.
    pub async fn probe_once(&self) -> ConnectivityStatus {
        Self::poll(&self.http, &self.config.health_url, &self.state).await
    }

    /// Start polling in the background. The first poll happens immediately.
    #[instrument(skip(self), fields(url = %self.config.health_url))]
    pub fn start(&mut self) -> std::result::Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let http = self.http.clone();
        let url = self.config.health_url.clone();
        let state = Arc::clone(&self.state);
        let interval = self.config.interval;
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("connectivity probe cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        Self::poll(&http, &url, &state).await;
                    }
                }
            }
        });

        self.task_handle = Some(handle);
        info!(interval_secs = interval.as_secs(), "connectivity probe started");
        Ok(())
    }

    /// Stop polling and wait for the task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> std::result::Result<(), WorkerError> {
        let Some(handle) = self.task_handle.take() else {
            return Err(WorkerError::NotRunning);
        };

        self.cancellation.cancel();

        let join_timeout = self.config.join_timeout;
        match tokio::time::timeout(join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "connectivity probe task panicked");
                return Err(WorkerError::TaskJoinFailed(e.to_string()));
            }
            Err(_) => {
                warn!("connectivity probe did not complete within timeout");
                return Err(WorkerError::Timeout {
                    millis: u64::try_from(join_timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }

        info!("connectivity probe stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn poll(http: &HttpClient, url: &str, state: &WatchConnectivity) -> ConnectivityStatus {
        let status = match http.send_once(http.request(Method::GET, url)).await {
            Ok(response) => {
                debug!(status = %response.status(), "health probe answered");
                ConnectivityStatus::online(PROBE_TRANSPORT)
            }
            Err(err) => {
                debug!(error = %err, "health probe failed");
                ConnectivityStatus::offline()
            }
        };
        state.update(status.clone());
        status
    }
}

#[async_trait]
impl ConnectivityMonitor for ProbeConnectivity {
    /// Performs a live poll rather than returning the cached status.
    async fn fetch_status(&self) -> Result<ConnectivityStatus> {
        Ok(self.probe_once().await)
    }

    fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.state.subscribe()
    }
}

impl Drop for ProbeConnectivity {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("ProbeConnectivity dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}
