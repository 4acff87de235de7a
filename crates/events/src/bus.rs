//! In-process progress bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`ProgressBus`] is the default transport between the scheduler and any
//! number of in-process observers. It is designed to be shared via
//! `Arc<ProgressBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use pixbatch_core::config::{BatchConfig, DEFAULT_EVENT_CAPACITY};
use pixbatch_core::{JobIndex, ProgressStatus};

use crate::notifier::ProgressNotifier;

// ---------------------------------------------------------------------------
// ProgressEvent
// ---------------------------------------------------------------------------

/// A single job status change as seen by an observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Index of the job within its run.
    pub index: JobIndex,

    /// Status the job moved to.
    pub status: ProgressStatus,

    /// When the event was emitted (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Create an event stamped with the current time.
    pub fn new(index: JobIndex, status: ProgressStatus) -> Self {
        Self {
            index,
            status,
            timestamp: Utc::now(),
        }
    }

    /// JSON message form for text transports.
    pub fn to_message(&self) -> serde_json::Value {
        serde_json::json!({
            "type": self.status.message_type(),
            "job_index": self.index,
        })
    }
}

// ---------------------------------------------------------------------------
// ProgressBus
// ---------------------------------------------------------------------------

/// In-process fan-out bus for [`ProgressEvent`]s.
///
/// # Usage
///
/// ```rust
/// use pixbatch_core::ProgressStatus;
/// use pixbatch_events::bus::ProgressBus;
/// use pixbatch_events::notifier::ProgressNotifier;
///
/// let bus = ProgressBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.notify(0, ProgressStatus::Processing);
/// ```
pub struct ProgressBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Create a bus sized by `PIXBATCH_EVENT_CAPACITY`.
    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.event_capacity)
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: ProgressEvent) {
        // Ignore the SendError, it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl ProgressNotifier for ProgressBus {
    fn notify(&self, index: JobIndex, status: ProgressStatus) {
        self.publish(ProgressEvent::new(index, status));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_reaches_single_subscriber() {
        let bus = ProgressBus::default();
        let mut rx = bus.subscribe();

        bus.notify(7, ProgressStatus::Processing);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.index, 7);
        assert_eq!(received.status, ProgressStatus::Processing);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = ProgressBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.notify(1, ProgressStatus::Completed);

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.status, ProgressStatus::Completed);
        assert_eq!(e2.status, ProgressStatus::Completed);
    }

    #[tokio::test]
    async fn per_job_order_is_preserved() {
        let bus = ProgressBus::default();
        let mut rx = bus.subscribe();

        bus.notify(2, ProgressStatus::Processing);
        bus.notify(2, ProgressStatus::Cancelled);

        assert_eq!(rx.recv().await.unwrap().status, ProgressStatus::Processing);
        assert_eq!(rx.recv().await.unwrap().status, ProgressStatus::Cancelled);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = ProgressBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.notify(0, ProgressStatus::Failed);
    }

    #[test]
    fn message_form_carries_type_and_index() {
        let event = ProgressEvent::new(4, ProgressStatus::Failed);
        let message = event.to_message();
        assert_eq!(message["type"], "job_failed");
        assert_eq!(message["job_index"], 4);
    }
}
