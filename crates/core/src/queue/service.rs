//! Persistent mutation queue

use std::sync::Arc;

use fieldsync_domain::constants::{FAILED_QUEUE_KEY, PROCESSING_FLAG_KEY, QUEUE_KEY};
use fieldsync_domain::{
    FailedOperation, NewOperation, OperationId, Priority, QueueConfig, QueueStats,
    QueuedOperation, Result,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::queue::errors::{QueueError, QueueResult};
use crate::queue::metrics::{QueueMetrics, QueueMetricsSnapshot};
use crate::queue::persistence::JsonStore;
use crate::storage_ports::KeyValueStore;
use crate::time::Clock;

/// Result of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// The operation stays pending with the new retry count.
    RetryScheduled { retry_count: u32 },
    /// Retries are exhausted; the operation moved to the failed queue.
    Quarantined,
    /// No pending operation had this id.
    NotFound,
}

/// Durable, deduplicating, priority-ordered queue of write operations.
///
/// Every mutation holds one async lock across its whole read-modify-write so
/// concurrent callers never interleave on the persisted collections.
pub struct MutationQueue {
    storage: JsonStore,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
    metrics: Arc<QueueMetrics>,
    lock: Mutex<()>,
}

impl MutationQueue {
    /// Queue persisting to `store`. Ids are fresh UUIDs and timestamps come
    /// from `clock`.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: QueueConfig) -> Self {
        let metrics = Arc::new(QueueMetrics::new());
        Self {
            storage: JsonStore::new(store, Arc::clone(&metrics)),
            clock,
            config,
            metrics,
            lock: Mutex::new(()),
        }
    }

    /// Persist a new operation.
    ///
    /// # Errors
    /// - `QueueError::DuplicateOperation` if an identical request was
    ///   enqueued within the dedup window; nothing is added.
    /// - `QueueError::Domain` for invalid operations or store failures.
    #[instrument(skip(self, op), fields(endpoint = %op.endpoint, method = %op.method, priority = %op.priority))]
    pub async fn enqueue(&self, op: NewOperation) -> QueueResult<OperationId> {
        op.validate()?;

        let _guard = self.lock.lock().await;
        let mut pending = self.storage.pending().await?;
        let now = self.clock.now_millis();
        let window = i64::try_from(self.config.dedup_window_ms).unwrap_or(i64::MAX);

        if let Some(existing) = pending.iter().find(|existing| {
            existing.is_same_request(&op.endpoint, op.method, &op.payload)
                && now.saturating_sub(existing.enqueued_at) < window
        }) {
            self.metrics.record_duplicate();
            debug!(existing_id = %existing.id, "Rejected duplicate operation");
            return Err(QueueError::DuplicateOperation { existing_id: existing.id.clone() });
        }

        let id = Uuid::new_v4().to_string();
        pending.push(QueuedOperation::from_new(
            op,
            id.clone(),
            now,
            self.config.default_max_retries,
        ));
        sort_pending(&mut pending);

        self.storage.save_pending(&pending).await?;
        self.refresh_stats(&pending, None).await?;
        self.metrics.record_enqueue();

        info!(operation_id = %id, pending = pending.len(), "Operation enqueued");
        Ok(id)
    }

    /// Snapshot of the pending queue in replay order.
    ///
    /// # Errors
    /// Only store I/O failures; corrupt data reads as empty.
    pub async fn list_pending(&self) -> Result<Vec<QueuedOperation>> {
        self.storage.pending().await
    }

    /// Look up one pending operation by id.
    pub async fn get(&self, id: &str) -> Result<Option<QueuedOperation>> {
        Ok(self.storage.pending().await?.into_iter().find(|op| op.id == id))
    }

    /// Remove a replayed operation. Returns `false` if it was already gone.
    #[instrument(skip(self))]
    pub async fn complete(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut pending = self.storage.pending().await?;
        let before = pending.len();
        pending.retain(|op| op.id != id);

        if pending.len() == before {
            debug!("Complete for unknown operation ignored");
            return Ok(false);
        }

        self.storage.save_pending(&pending).await?;
        self.refresh_stats(&pending, None).await?;
        self.metrics.record_completion();
        Ok(true)
    }

    /// Record a failed attempt, quarantining the operation once its retries
    /// are exhausted.
    #[instrument(skip(self, error))]
    pub async fn fail(&self, id: &str, error: &str) -> Result<FailOutcome> {
        let _guard = self.lock.lock().await;
        let mut pending = self.storage.pending().await?;

        let Some(index) = pending.iter().position(|op| op.id == id) else {
            warn!("Fail reported for unknown operation");
            return Ok(FailOutcome::NotFound);
        };

        pending[index].retry_count += 1;

        if pending[index].is_exhausted() {
            let op = pending.remove(index);
            let retry_count = op.retry_count;
            let mut failed = self.storage.failed().await?;
            failed.push(FailedOperation::new(op, error, self.clock.now_millis()));

            // Failed queue first: a crash in between duplicates rather than loses.
            self.storage.save_failed(&failed).await?;
            self.storage.save_pending(&pending).await?;
            self.refresh_stats(&pending, Some(failed.len())).await?;
            self.metrics.record_failure(true);

            warn!(retry_count, error, "Operation quarantined after exhausting retries");
            return Ok(FailOutcome::Quarantined);
        }

        let retry_count = pending[index].retry_count;
        self.storage.save_pending(&pending).await?;
        self.refresh_stats(&pending, None).await?;
        self.metrics.record_failure(false);

        debug!(retry_count, "Retry scheduled");
        Ok(FailOutcome::RetryScheduled { retry_count })
    }

    /// Move every quarantined operation back to pending with a fresh retry
    /// budget. Returns how many were moved.
    #[instrument(skip(self))]
    pub async fn retry_all_failed(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let failed = self.storage.failed().await?;
        if failed.is_empty() {
            return Ok(0);
        }

        let now = self.clock.now_millis();
        let count = failed.len();
        let mut pending = self.storage.pending().await?;
        pending.extend(failed.into_iter().map(|entry| QueuedOperation {
            retry_count: 0,
            enqueued_at: now,
            ..entry.operation
        }));
        sort_pending(&mut pending);

        self.storage.save_pending(&pending).await?;
        self.storage.save_failed(&[]).await?;
        self.refresh_stats(&pending, Some(0)).await?;
        self.metrics.record_requeue(count as u64);

        info!(count, "Requeued failed operations");
        Ok(count)
    }

    /// Quarantined operations with their last error, oldest first.
    pub async fn list_failed(&self) -> Result<Vec<FailedOperation>> {
        self.storage.failed().await
    }

    /// Drop one quarantined operation for good. Returns `false` if absent.
    #[instrument(skip(self))]
    pub async fn discard_failed(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut failed = self.storage.failed().await?;
        let before = failed.len();
        failed.retain(|entry| entry.operation.id != id);

        if failed.len() == before {
            return Ok(false);
        }

        self.storage.save_failed(&failed).await?;
        let pending = self.storage.pending().await?;
        self.refresh_stats(&pending, Some(failed.len())).await?;
        Ok(true)
    }

    /// Empty the pending queue, the failed queue and the processing flag.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.storage.remove_many(&[QUEUE_KEY, FAILED_QUEUE_KEY, PROCESSING_FLAG_KEY]).await?;
        self.refresh_stats(&[], Some(0)).await?;
        info!("Queue cleared");
        Ok(())
    }

    /// Persisted "a drain is running" marker, written by the orchestrator.
    pub async fn set_processing_flag(&self, processing: bool) -> Result<()> {
        self.storage.save_processing(processing).await
    }

    /// Whether the persisted processing flag is set. Missing reads as false.
    pub async fn is_processing(&self) -> Result<bool> {
        self.storage.processing().await
    }

    /// Persisted stats, recomputed if missing or unreadable.
    pub async fn stats(&self) -> Result<QueueStats> {
        if let Some(stats) = self.storage.stats().await? {
            return Ok(stats);
        }

        let _guard = self.lock.lock().await;
        let pending = self.storage.pending().await?;
        self.refresh_stats(&pending, None).await
    }

    /// Stamp the time of the last drain that reached the remote.
    pub async fn record_sync(&self, at: i64) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut stats = match self.storage.stats().await? {
            Some(stats) => stats,
            None => {
                let pending = self.storage.pending().await?;
                compute_stats(&pending, self.storage.failed().await?.len(), None)
            }
        };
        stats.last_sync = Some(at);
        self.storage.save_stats(&stats).await
    }

    /// In-process counters since this queue was built.
    pub fn metrics(&self) -> QueueMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Recompute and persist stats. Callers must hold `lock`.
    ///
    /// `failed_len` skips re-reading the failed queue when the caller already
    /// knows its length.
    async fn refresh_stats(
        &self,
        pending: &[QueuedOperation],
        failed_len: Option<usize>,
    ) -> Result<QueueStats> {
        let failed = match failed_len {
            Some(len) => len,
            None => self.storage.failed().await?.len(),
        };
        let last_sync = self.storage.stats().await?.and_then(|stats| stats.last_sync);
        let stats = compute_stats(pending, failed, last_sync);
        self.storage.save_stats(&stats).await?;
        Ok(stats)
    }
}

fn compute_stats(pending: &[QueuedOperation], failed: usize, last_sync: Option<i64>) -> QueueStats {
    QueueStats {
        pending: pending.len(),
        high_priority: pending.iter().filter(|op| op.priority == Priority::High).count(),
        failed,
        last_sync,
    }
}

/// Stable sort by priority band, then enqueue time.
fn sort_pending(pending: &mut [QueuedOperation]) {
    pending.sort_by_key(QueuedOperation::order_key);
}
