//! Background sync orchestrator
//!
//! Drains the mutation queue against the remote API one operation at a time,
//! then refreshes the cached reference datasets. At most one drain runs per
//! orchestrator; a second caller gets an empty, unsuccessful result at once.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fieldsync_domain::constants::SYNC_STATE_KEY;
use fieldsync_domain::{
    DatasetFailure, DatasetKind, FieldSyncError, HttpMethod, PullSyncReport, QueuedOperation,
    Result, SyncConfig, SyncErrorEntry, SyncFailureKind, SyncResult, SyncState,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::connectivity_ports::ConnectivityMonitor;
use crate::queue::{FailOutcome, MutationQueue};
use crate::storage_ports::KeyValueStore;
use crate::sync::backoff::backoff_delay;
use crate::sync::options::DrainOptions;
use crate::sync::ports::RemoteApi;
use crate::time::Clock;

/// Coordinates queue drains and reference-data refreshes.
pub struct SyncOrchestrator {
    queue: Arc<MutationQueue>,
    api: Arc<dyn RemoteApi>,
    connectivity: Arc<dyn ConnectivityMonitor>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    active: AtomicBool,
    cancel: Mutex<Option<CancellationToken>>,
}

impl SyncOrchestrator {
    /// Build an orchestrator over the given queue and ports. `store` is the
    /// same store the queue persists to; it also holds sync state and the
    /// dataset cache.
    pub fn new(
        queue: Arc<MutationQueue>,
        api: Arc<dyn RemoteApi>,
        connectivity: Arc<dyn ConnectivityMonitor>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        Self {
            queue,
            api,
            connectivity,
            store,
            clock,
            config,
            active: AtomicBool::new(false),
            cancel: Mutex::new(None),
        }
    }

    /// The queue this orchestrator drains.
    pub fn queue(&self) -> &Arc<MutationQueue> {
        &self.queue
    }

    /// Backoff, pause and timeout settings in effect.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Replay every pending operation once, in queue order.
    ///
    /// Per-operation failures are recorded in the queue and reported in
    /// `SyncResult::errors`; they never make the drain itself fail.
    #[instrument(skip(self, options))]
    pub async fn drain(&self, options: DrainOptions) -> SyncResult {
        // Latch before the first await so two callers can never both pass.
        if self.active.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err()
        {
            debug!("Drain already in flight");
            return SyncResult::already_running(self.clock.now_millis());
        }
        let latch = ActiveLatch(&self.active);

        if !self.is_online().await {
            drop(latch);
            info!("Skipping drain while offline");
            let result = SyncResult::offline(self.clock.now_millis());
            options.report_complete(&result);
            return result;
        }

        let token = options.drain_token();
        *self.cancel.lock() = Some(token.clone());

        let mut result = SyncResult::new(self.clock.now_millis());
        if let Err(err) = self.run_drain(&token, &options, &mut result).await {
            error!(error = %err, "Drain stopped by orchestrator failure");
            result.success = false;
            result.errors.push(SyncErrorEntry {
                operation: None,
                message: err.to_string(),
                kind: SyncFailureKind::Transient,
            });
        }

        if let Err(err) = self.finish_drain().await {
            error!(error = %err, "Failed to reset drain state");
            result.success = false;
        }

        *self.cancel.lock() = None;
        drop(latch);

        result.timestamp = self.clock.now_millis();
        info!(
            processed = result.processed,
            failed = result.failed,
            success = result.success,
            "Drain finished"
        );
        options.report_complete(&result);
        result
    }

    /// Drain, then refresh every reference dataset if the drain succeeded and
    /// was not cancelled.
    #[instrument(skip(self, options))]
    pub async fn full_sync(&self, options: DrainOptions) -> SyncResult {
        let result = self.drain(options.clone()).await;

        if result.success && !result.cancelled && !options.is_cancelled() {
            let report = self.pull_sync(&DatasetKind::ALL).await;
            debug!(
                refreshed = report.refreshed.len(),
                failed = report.failed.len(),
                "Pull sync after drain"
            );
        }

        result
    }

    /// Refresh the cached copy of each dataset. A failure for one dataset is
    /// logged and does not stop the others. No-op while offline.
    #[instrument(skip(self))]
    pub async fn pull_sync(&self, kinds: &[DatasetKind]) -> PullSyncReport {
        if !self.is_online().await {
            debug!("Skipping pull sync while offline");
            return PullSyncReport::offline();
        }

        let mut report = PullSyncReport::default();
        for &kind in kinds {
            match self.refresh_dataset(kind).await {
                Ok(()) => report.refreshed.push(kind),
                Err(err) => {
                    warn!(dataset = %kind, error = %err, "Dataset refresh failed");
                    report.failed.push(DatasetFailure { kind, message: err.to_string() });
                }
            }
        }
        report
    }

    /// Request cancellation of the in-flight drain. Operations not yet
    /// attempted stay pending. Returns `false` when idle.
    pub fn abort(&self) -> bool {
        match self.cancel.lock().as_ref() {
            Some(token) => {
                token.cancel();
                info!("Drain cancellation requested");
                true
            }
            None => false,
        }
    }

    /// True while a drain holds the latch.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Detect a drain that was interrupted by a previous process exit.
    ///
    /// Returns the stale progress and resets the persisted markers. Nothing is
    /// resumed; the operations are still pending and the next drain picks
    /// them up.
    #[instrument(skip(self))]
    pub async fn recover_interrupted(&self) -> Result<Option<SyncState>> {
        if self.is_active() {
            return Ok(None);
        }

        let processing = self.queue.is_processing().await?;
        let state = self.load_sync_state().await?;
        if !processing && !state.active {
            return Ok(None);
        }

        warn!(
            total = state.total,
            current = state.current,
            "Previous drain was interrupted before finishing"
        );
        self.queue.set_processing_flag(false).await?;
        self.save_sync_state(SyncState::idle()).await?;
        Ok(Some(state))
    }

    /// Persisted drain progress.
    pub async fn sync_state(&self) -> Result<SyncState> {
        self.load_sync_state().await
    }

    /// Cached JSON of a dataset, `None` if never fetched or unreadable.
    pub async fn cached_dataset(&self, kind: DatasetKind) -> Result<Option<Value>> {
        let Some(raw) = self.store.get(kind.cache_key()).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(dataset = %kind, error = %err, "Discarding corrupt dataset cache");
                Ok(None)
            }
        }
    }

    /// Milliseconds since the Unix epoch of the last successful refresh.
    pub async fn last_synced_at(&self, kind: DatasetKind) -> Result<Option<i64>> {
        Ok(self.store.get(kind.last_sync_key()).await?.and_then(|raw| raw.trim().parse().ok()))
    }

    async fn run_drain(
        &self,
        token: &CancellationToken,
        options: &DrainOptions,
        result: &mut SyncResult,
    ) -> Result<()> {
        self.queue.set_processing_flag(true).await?;

        let snapshot = self.queue.list_pending().await?;
        let total = snapshot.len();
        info!(total, "Drain started");
        self.save_sync_state(SyncState::in_progress(total, 0)).await?;

        let pause = self.config.inter_operation_pause();
        for (index, op) in snapshot.into_iter().enumerate() {
            if token.is_cancelled() {
                info!(remaining = total - index, "Drain cancelled");
                result.cancelled = true;
                break;
            }

            let delay =
                backoff_delay(op.retry_count, self.config.backoff_base(), self.config.backoff_cap());
            if !delay.is_zero() {
                debug!(operation_id = %op.id, delay_ms = delay.as_millis() as u64, "Backing off");
                if !sleep_unless_cancelled(token, delay).await {
                    info!(remaining = total - index, "Drain cancelled during backoff");
                    result.cancelled = true;
                    break;
                }
            }

            self.attempt(op, result).await?;

            let current = index + 1;
            self.save_sync_state(SyncState::in_progress(total, current)).await?;
            options.report_progress(current, total);

            if current < total && !pause.is_zero() {
                sleep_unless_cancelled(token, pause).await;
            }
        }

        self.queue.record_sync(self.clock.now_millis()).await
    }

    async fn attempt(&self, mut op: QueuedOperation, result: &mut SyncResult) -> Result<()> {
        match self.dispatch(&op).await {
            Ok(_) => {
                self.queue.complete(&op.id).await?;
                result.processed += 1;
                debug!(operation_id = %op.id, "Operation synced");
            }
            Err(err) => {
                let message = err.to_string();
                let outcome = self.queue.fail(&op.id, &message).await?;
                let kind = match outcome {
                    FailOutcome::Quarantined => SyncFailureKind::Terminal,
                    FailOutcome::RetryScheduled { .. } | FailOutcome::NotFound => {
                        SyncFailureKind::Transient
                    }
                };
                if outcome != FailOutcome::NotFound {
                    op.retry_count += 1;
                }

                warn!(operation_id = %op.id, error = %err, ?outcome, "Operation failed");
                result.failed += 1;
                result.errors.push(SyncErrorEntry::for_operation(op, message, kind));
            }
        }
        Ok(())
    }

    async fn dispatch(&self, op: &QueuedOperation) -> Result<Value> {
        let call = async {
            match op.method {
                HttpMethod::Post => self.api.post(&op.endpoint, &op.payload).await,
                HttpMethod::Put => self.api.put(&op.endpoint, &op.payload).await,
                HttpMethod::Patch => self.api.patch(&op.endpoint, &op.payload).await,
                HttpMethod::Delete => self.api.delete(&op.endpoint).await,
            }
        };
        self.with_timeout(&format!("{} {}", op.method, op.endpoint), call).await
    }

    async fn refresh_dataset(&self, kind: DatasetKind) -> Result<()> {
        let data = self.with_timeout(kind.endpoint(), self.api.fetch_dataset(kind)).await?;
        self.store.set(kind.cache_key(), &serde_json::to_string(&data)?).await?;
        self.store.set(kind.last_sync_key(), &self.clock.now_millis().to_string()).await
    }

    /// Timed-out calls surface as `FieldSyncError::Timeout`, i.e. a retryable
    /// failure.
    async fn with_timeout<T>(
        &self,
        call_name: &str,
        call: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match self.config.operation_timeout() {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                FieldSyncError::Timeout(format!(
                    "{call_name} did not complete within {}ms",
                    limit.as_millis()
                ))
            })?,
            None => call.await,
        }
    }

    async fn finish_drain(&self) -> Result<()> {
        let state = self.save_sync_state(SyncState::idle()).await;
        let flag = self.queue.set_processing_flag(false).await;
        state.and(flag)
    }

    async fn load_sync_state(&self) -> Result<SyncState> {
        let Some(raw) = self.store.get(SYNC_STATE_KEY).await? else {
            return Ok(SyncState::idle());
        };
        match serde_json::from_str(&raw) {
            Ok(state) => Ok(state),
            Err(err) => {
                warn!(error = %err, "Discarding corrupt sync state");
                Ok(SyncState::idle())
            }
        }
    }

    async fn save_sync_state(&self, state: SyncState) -> Result<()> {
        self.store.set(SYNC_STATE_KEY, &serde_json::to_string(&state)?).await
    }

    async fn is_online(&self) -> bool {
        match self.connectivity.fetch_status().await {
            Ok(status) => status.is_connected,
            Err(err) => {
                warn!(error = %err, "Connectivity check failed, treating as offline");
                false
            }
        }
    }
}

/// Returns false if `token` fired before `delay` elapsed.
async fn sleep_unless_cancelled(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Releases the single-flight latch, even if the drain future is dropped.
struct ActiveLatch<'a>(&'a AtomicBool);

impl Drop for ActiveLatch<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
