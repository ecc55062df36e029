//! Domain types shared by the queue, the orchestrator and the adapters

pub mod connectivity;
pub mod operation;
pub mod sync;

pub use connectivity::ConnectivityStatus;
pub use operation::{
    FailedOperation, HttpMethod, NewOperation, OperationId, OperationKind, Priority,
    QueuedOperation,
};
pub use sync::{
    DatasetFailure, DatasetKind, PullSyncReport, QueueStats, SyncErrorEntry, SyncFailureKind,
    SyncResult, SyncState,
};
