use std::fmt;
use std::sync::Arc;

use fieldsync_domain::SyncResult;
use tokio_util::sync::CancellationToken;

/// Called with `(current, total)` after every attempted operation.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Called once with the final result of a drain.
pub type CompleteCallback = Arc<dyn Fn(&SyncResult) + Send + Sync>;

/// Caller hooks for a single drain
#[derive(Clone, Default)]
pub struct DrainOptions {
    on_progress: Option<ProgressCallback>,
    on_complete: Option<CompleteCallback>,
    cancel_on: Option<CancellationToken>,
}

impl DrainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, callback: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_complete(mut self, callback: impl Fn(&SyncResult) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    /// Stop the drain between operations once `token` is cancelled, in
    /// addition to [`SyncOrchestrator::abort`](crate::SyncOrchestrator::abort).
    /// A token that is already cancelled stops the drain before its first
    /// operation.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel_on = Some(token);
        self
    }

    /// Token for a single drain, linked to the caller's token when one was
    /// given.
    pub(crate) fn drain_token(&self) -> CancellationToken {
        self.cancel_on
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_else(CancellationToken::new)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_on.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    pub(crate) fn report_progress(&self, current: usize, total: usize) {
        if let Some(callback) = &self.on_progress {
            callback(current, total);
        }
    }

    pub(crate) fn report_complete(&self, result: &SyncResult) {
        if let Some(callback) = &self.on_complete {
            callback(result);
        }
    }
}

impl fmt::Debug for DrainOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainOptions")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("cancel_on", &self.cancel_on.is_some())
            .finish()
    }
}
