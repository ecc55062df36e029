//! Background worker error types

use fieldsync_domain::FieldSyncError;
use thiserror::Error;

use crate::errors::InfraError;

/// Lifecycle errors for background workers
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Worker is already running
    #[error("Worker already running")]
    AlreadyRunning,

    /// Worker is not running
    #[error("Worker not running")]
    NotRunning,

    /// Background task panicked or was aborted
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),

    /// Background task did not finish within the join timeout
    #[error("Worker did not stop within {millis}ms")]
    Timeout { millis: u64 },
}

impl From<WorkerError> for InfraError {
    fn from(err: WorkerError) -> Self {
        let domain_err = match err {
            WorkerError::AlreadyRunning | WorkerError::NotRunning => {
                FieldSyncError::InvalidInput(err.to_string())
            }
            WorkerError::Timeout { .. } => FieldSyncError::Timeout(err.to_string()),
            WorkerError::TaskJoinFailed(_) => FieldSyncError::Internal(err.to_string()),
        };
        InfraError(domain_err)
    }
}

impl From<WorkerError> for FieldSyncError {
    fn from(err: WorkerError) -> Self {
        InfraError::from(err).into()
    }
}
