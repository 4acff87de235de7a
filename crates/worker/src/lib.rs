//! Batch execution for pixbatch.
//!
//! A [`Scheduler`] turns the inputs of a [`JobList`] into [`ImageJob`]s,
//! runs them through a [`TransformRegistry`] with bounded parallelism and
//! reports every status change to a
//! [`ProgressNotifier`](pixbatch_events::ProgressNotifier). The returned
//! [`RunHandle`] cancels the run or single jobs and yields a
//! [`BatchSummary`] once every job is terminal.

pub mod cancel;
pub mod error;
pub mod job;
pub mod list;
pub mod registry;
pub mod report;
pub mod scheduler;

pub use cancel::CancellationController;
pub use error::BatchError;
pub use job::ImageJob;
pub use list::{JobList, RunGuard};
pub use registry::{OperationRegistry, TransformRegistry, TransformSpec};
pub use report::{BatchSummary, JobReport};
pub use scheduler::{RunHandle, Scheduler};
