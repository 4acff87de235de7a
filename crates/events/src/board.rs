//! Observer-side status table.
//!
//! [`StatusBoard`] is what a results view keeps: one status slot per job
//! of a run, addressed by the index snapshot taken at run start. Events
//! for unknown indices and events that would move a slot backwards are
//! dropped, so a late or duplicated message cannot corrupt the view.

use tokio::sync::{broadcast, RwLock};

use pixbatch_core::{JobIndex, JobStatus, ProgressStatus};

use crate::bus::ProgressEvent;

/// Per-run table of job statuses maintained from progress events.
pub struct StatusBoard {
    slots: RwLock<Vec<JobStatus>>,
}

impl StatusBoard {
    /// A board for `job_count` jobs, all `Pending`.
    pub fn new(job_count: usize) -> Self {
        Self {
            slots: RwLock::new(vec![JobStatus::Pending; job_count]),
        }
    }

    /// Number of slots.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Whether the board tracks no jobs.
    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    /// Apply one event. Returns `true` if the slot changed.
    pub async fn apply(&self, index: JobIndex, status: ProgressStatus) -> bool {
        let next = JobStatus::from(status);
        let mut slots = self.slots.write().await;

        let Some(slot) = slots.get_mut(index as usize) else {
            tracing::warn!(index, status = %next, "Progress event for unknown job index");
            return false;
        };

        if !slot.can_transition_to(next) {
            tracing::debug!(index, from = %slot, to = %next, "Ignoring out-of-order progress event");
            return false;
        }

        *slot = next;
        true
    }

    /// Current status of one job, if the index is known.
    pub async fn status(&self, index: JobIndex) -> Option<JobStatus> {
        self.slots.read().await.get(index as usize).copied()
    }

    /// Display label for one job, if the index is known.
    pub async fn label(&self, index: JobIndex) -> Option<&'static str> {
        self.status(index).await.map(JobStatus::label)
    }

    /// Copy of every slot, in index order.
    pub async fn snapshot(&self) -> Vec<JobStatus> {
        self.slots.read().await.clone()
    }

    /// Whether every job has reached a terminal status.
    pub async fn is_settled(&self) -> bool {
        self.slots.read().await.iter().all(|s| s.is_terminal())
    }

    /// Apply events from a bus subscription until the bus is closed.
    pub async fn run(&self, mut receiver: broadcast::Receiver<ProgressEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    self.apply(event.index, event.status).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Status board lagged, some events were missed");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Progress bus closed, status board stopping");
                    break;
                }
            }
        }
    }
}
