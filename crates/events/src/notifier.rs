//! The progress notification contract.
//!
//! The scheduler reports job progress through an injected
//! [`ProgressNotifier`] and never learns how the event travels. An
//! implementation may publish in-process, push into a channel, or write
//! to another process; it must accept calls from many worker tasks at
//! once and must not block for long.

use std::sync::Arc;

use pixbatch_core::{JobIndex, ProgressStatus};

/// Sink for per-job progress events.
///
/// Delivery is fire-and-forget: there is no return value, no
/// acknowledgement and no retry. For a given job the scheduler calls
/// `notify` with `Processing` first and then exactly one terminal status;
/// implementations must preserve that order per job.
pub trait ProgressNotifier: Send + Sync {
    fn notify(&self, index: JobIndex, status: ProgressStatus);
}

impl<T: ProgressNotifier + ?Sized> ProgressNotifier for Arc<T> {
    fn notify(&self, index: JobIndex, status: ProgressStatus) {
        (**self).notify(index, status)
    }
}

impl<T: ProgressNotifier + ?Sized> ProgressNotifier for Box<T> {
    fn notify(&self, index: JobIndex, status: ProgressStatus) {
        (**self).notify(index, status)
    }
}

/// Discards every event. Used when nobody observes the run.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl ProgressNotifier for NullNotifier {
    fn notify(&self, _index: JobIndex, _status: ProgressStatus) {}
}

/// Adapts a closure into a [`ProgressNotifier`].
///
/// ```rust
/// use pixbatch_core::ProgressStatus;
/// use pixbatch_events::notifier::{FnNotifier, ProgressNotifier};
///
/// let notifier = FnNotifier::new(|index, status: ProgressStatus| {
///     println!("job {index}: {}", status.message_type());
/// });
/// notifier.notify(0, ProgressStatus::Processing);
/// ```
pub struct FnNotifier<F>(F);

impl<F> FnNotifier<F>
where
    F: Fn(JobIndex, ProgressStatus) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ProgressNotifier for FnNotifier<F>
where
    F: Fn(JobIndex, ProgressStatus) + Send + Sync,
{
    fn notify(&self, index: JobIndex, status: ProgressStatus) {
        (self.0)(index, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closure_notifier_forwards_calls() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let notifier = FnNotifier::new(move |index, status| {
            sink.lock().unwrap().push((index, status));
        });

        notifier.notify(3, ProgressStatus::Processing);
        notifier.notify(3, ProgressStatus::Failed);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(3, ProgressStatus::Processing), (3, ProgressStatus::Failed)]
        );
    }

    #[test]
    fn arc_dyn_notifier_is_a_notifier() {
        let notifier: Arc<dyn ProgressNotifier> = Arc::new(NullNotifier);
        // Must compile and must not panic.
        notifier.notify(0, ProgressStatus::Completed);
    }
}
