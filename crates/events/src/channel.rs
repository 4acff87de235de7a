//! Single-consumer transport over a `tokio::sync::mpsc` channel.

use tokio::sync::mpsc;

use pixbatch_core::{JobIndex, ProgressStatus};

use crate::bus::ProgressEvent;
use crate::notifier::ProgressNotifier;

/// Notifier that forwards every event to one receiver.
///
/// The channel is unbounded so `notify` never waits on a slow consumer.
/// Events sent after the receiver is dropped are discarded.
#[derive(Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver that drains it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressNotifier for ChannelNotifier {
    fn notify(&self, index: JobIndex, status: ProgressStatus) {
        let _ = self.sender.send(ProgressEvent::new(index, status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let (notifier, mut rx) = ChannelNotifier::new();

        notifier.notify(0, ProgressStatus::Processing);
        notifier.notify(1, ProgressStatus::Processing);
        notifier.notify(0, ProgressStatus::Completed);
        drop(notifier);

        let mut got = Vec::new();
        while let Some(event) = rx.recv().await {
            got.push((event.index, event.status));
        }
        assert_eq!(
            got,
            vec![
                (0, ProgressStatus::Processing),
                (1, ProgressStatus::Processing),
                (0, ProgressStatus::Completed),
            ]
        );
    }

    #[test]
    fn closed_receiver_is_ignored() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(0, ProgressStatus::Failed);
    }
}
