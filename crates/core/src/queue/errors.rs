use fieldsync_domain::{FieldSyncError, OperationId};
use thiserror::Error;

/// Errors returned by the mutation queue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// An identical request is already pending inside the dedup window.
    #[error("Duplicate operation: identical request already queued as {existing_id}")]
    DuplicateOperation { existing_id: OperationId },

    #[error(transparent)]
    Domain(#[from] FieldSyncError),
}

impl QueueError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateOperation { .. })
    }
}

pub type QueueResult<T> = Result<T, QueueError>;
