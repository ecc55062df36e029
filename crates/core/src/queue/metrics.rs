use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

/// Queue metrics for monitoring
#[derive(Debug, Default)]
pub struct QueueMetrics {
    pub enqueued: AtomicU64,
    pub duplicates_rejected: AtomicU64,
    pub completed: AtomicU64,
    pub failed_attempts: AtomicU64,
    pub quarantined: AtomicU64,
    pub requeued: AtomicU64,
    pub corrupt_reads: AtomicU64,
    pub persistence_failures: AtomicU64,
}

impl QueueMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueue(&self) {
        self.enqueued.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_rejected.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.completed.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Record a failed attempt, and whether it pushed the operation into
    /// quarantine
    pub fn record_failure(&self, quarantined: bool) {
        self.failed_attempts.fetch_add(1, AtomicOrdering::Relaxed);
        if quarantined {
            self.quarantined.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    pub fn record_requeue(&self, count: u64) {
        self.requeued.fetch_add(count, AtomicOrdering::Relaxed);
    }

    /// Persisted collection could not be decoded and was treated as empty
    pub fn record_corrupt_read(&self) {
        self.corrupt_reads.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Get a snapshot of metrics
    pub fn snapshot(&self) -> QueueMetricsSnapshot {
        QueueMetricsSnapshot {
            enqueued: self.enqueued.load(AtomicOrdering::Relaxed),
            duplicates_rejected: self.duplicates_rejected.load(AtomicOrdering::Relaxed),
            completed: self.completed.load(AtomicOrdering::Relaxed),
            failed_attempts: self.failed_attempts.load(AtomicOrdering::Relaxed),
            quarantined: self.quarantined.load(AtomicOrdering::Relaxed),
            requeued: self.requeued.load(AtomicOrdering::Relaxed),
            corrupt_reads: self.corrupt_reads.load(AtomicOrdering::Relaxed),
            persistence_failures: self.persistence_failures.load(AtomicOrdering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`QueueMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMetricsSnapshot {
    pub enqueued: u64,
    pub duplicates_rejected: u64,
    pub completed: u64,
    pub failed_attempts: u64,
    pub quarantined: u64,
    pub requeued: u64,
    pub corrupt_reads: u64,
    pub persistence_failures: u64,
}

impl QueueMetricsSnapshot {
    /// Share of finished operations that completed, 1.0 when nothing ran yet
    pub fn success_rate(&self) -> f64 {
        let finished = self.completed + self.quarantined;
        if finished == 0 {
            return 1.0;
        }
        self.completed as f64 / finished as f64
    }
}
