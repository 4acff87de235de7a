//! Run-wide and per-job cancellation scopes.
//!
//! The controller owns one master [`CancellationToken`] per run. Every job
//! receives a child of it, so cancelling the run cancels every job while
//! cancelling a job leaves its siblings and the run untouched.

use tokio_util::sync::CancellationToken;

use crate::job::ImageJob;

#[derive(Debug, Clone, Default)]
pub struct CancellationController {
    run: CancellationToken,
}

impl CancellationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh per-job scope derived from the run scope.
    pub fn job_scope(&self) -> CancellationToken {
        self.run.child_token()
    }

    /// Cancel the run and with it every per-job scope.
    pub fn cancel_all(&self) {
        self.run.cancel();
    }

    /// Cancel a single job. No-op (returns `false`) if it is terminal.
    pub fn cancel_job(&self, job: &ImageJob) -> bool {
        job.request_cancel()
    }

    /// Whether the whole run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }
}
