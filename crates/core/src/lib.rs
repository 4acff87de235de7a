//! Domain types for the pixbatch image batch processor.
//!
//! Pure logic with no runtime dependencies: the job status state machine,
//! transform kinds, output naming, progress vocabulary, error taxonomy
//! and configuration.

pub mod config;
pub mod error;
pub mod job_events;
pub mod naming;
pub mod status;
pub mod transform;
pub mod types;

pub use error::{CoreError, TransformError};
pub use job_events::ProgressStatus;
pub use status::{JobStatus, StatusCell};
pub use transform::TransformKind;
pub use types::JobIndex;
