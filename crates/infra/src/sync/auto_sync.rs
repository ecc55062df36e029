//! Automatic sync on reconnect and on a timer.
//!
//! The worker owns one background task. It watches the connectivity channel
//! and runs [`SyncOrchestrator::full_sync`] on every offline to online
//! transition, plus on an optional periodic tick while online. Join handles
//! are tracked and cancellation is explicit.

use std::sync::Arc;
use std::time::Duration;

use fieldsync_core::{ConnectivityMonitor, DrainOptions, SyncOrchestrator};
use fieldsync_domain::{ConnectivityStatus, SyncConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::errors::WorkerError;

/// Configuration for the auto-sync worker.
#[derive(Debug, Clone)]
pub struct AutoSyncConfig {
    /// Run a full sync whenever connectivity comes back
    pub on_reconnect: bool,
    /// Periodic full sync while online
    pub periodic_interval: Option<Duration>,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for AutoSyncConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for AutoSyncConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            on_reconnect: config.auto_sync_on_reconnect,
            periodic_interval: config.periodic_interval(),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Why a sync was started.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Reconnect,
    Periodic,
}

impl Trigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::Reconnect => "reconnect",
            Self::Periodic => "periodic",
        }
    }
}

/// Background worker with explicit lifecycle management.
pub struct AutoSyncWorker {
    orchestrator: Arc<SyncOrchestrator>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    config: AutoSyncConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl AutoSyncWorker {
    /// Worker over `orchestrator`, triggered by `connectivity`. Call
    /// [`start`](Self::start) to spawn it.
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        config: AutoSyncConfig,
    ) -> Self {
        Self {
            orchestrator,
            connectivity,
            config,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Start the worker, spawning the background task.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        // Subscribe before spawning so no transition is missed.
        let receiver = self.connectivity.subscribe();
        let orchestrator = Arc::clone(&self.orchestrator);
        let config = self.config.clone();
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::run_loop(orchestrator, receiver, config, cancel).await;
        });

        self.task_handle = Some(handle);
        info!(
            on_reconnect = self.config.on_reconnect,
            periodic_secs = self.config.periodic_interval.map(|d| d.as_secs()),
            "auto-sync worker started"
        );
        Ok(())
    }

    /// Stop the worker and wait for the task to finish.
    ///
    /// A sync in progress is cancelled between operations and allowed to
    /// record the call in flight. If that takes longer than `join_timeout`
    /// this returns `WorkerError::Timeout` and the task finishes detached.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), WorkerError> {
        let Some(handle) = self.task_handle.take() else {
            return Err(WorkerError::NotRunning);
        };

        self.cancellation.cancel();

        let join_timeout = self.config.join_timeout;
        match tokio::time::timeout(join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "auto-sync task panicked");
                return Err(WorkerError::TaskJoinFailed(e.to_string()));
            }
            Err(_) => {
                warn!("auto-sync task did not complete within timeout");
                return Err(WorkerError::Timeout {
                    millis: u64::try_from(join_timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }

        info!("auto-sync worker stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// True between a successful `start` and the next `stop`.
    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn run_loop(
        orchestrator: Arc<SyncOrchestrator>,
        mut receiver: watch::Receiver<ConnectivityStatus>,
        config: AutoSyncConfig,
        cancel: CancellationToken,
    ) {
        let mut was_online = receiver.borrow_and_update().is_connected;
        let mut ticker = config.periodic_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut channel_open = true;

        loop {
            let trigger = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("auto-sync loop cancelled");
                    break;
                }
                changed = receiver.changed(), if channel_open => {
                    if changed.is_err() {
                        debug!("connectivity channel closed; reconnect trigger disabled");
                        channel_open = false;
                        continue;
                    }
                    let online = receiver.borrow_and_update().is_connected;
                    let reconnected = online && !was_online;
                    was_online = online;
                    if !(reconnected && config.on_reconnect) {
                        continue;
                    }
                    Trigger::Reconnect
                }
                _ = next_tick(&mut ticker) => {
                    if !was_online {
                        debug!("periodic sync skipped while offline");
                        continue;
                    }
                    Trigger::Periodic
                }
            };

            // The drain stops between operations once `cancel` fires; the call
            // in flight still gets its outcome recorded before we exit.
            let sync = orchestrator.full_sync(DrainOptions::new().cancel_on(cancel.clone()));
            tokio::pin!(sync);

            let (result, stopping) = tokio::select! {
                result = &mut sync => (result, false),
                _ = cancel.cancelled() => {
                    debug!("auto-sync stop requested mid-sync; waiting for the drain to wind down");
                    orchestrator.abort();
                    (sync.await, true)
                }
            };

            info!(
                trigger = trigger.as_str(),
                success = result.success,
                processed = result.processed,
                failed = result.failed,
                cancelled = result.cancelled,
                "auto-sync finished"
            );

            if stopping {
                break;
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl Drop for AutoSyncWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("AutoSyncWorker dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}
