// crates/guardian-runtime/src/broadcast.rs
// ============================================================================
// Module: Timeline Broadcast Hub
// Description: Bounded, drop-the-slow-subscriber fan-out for live timeline
// events.
// Purpose: Let any number of live listeners (a WebSocket handler, a CLI
// tail command) observe timeline events without back-pressuring the
// controller that produced them.
// Dependencies: guardian-core, tokio, serde_json
// ============================================================================

//! ## Overview
//! `TimelineHub` is deliberately not `tokio::sync::broadcast`: that
//! channel gives every subscriber the same ring buffer and reports a
//! lag error when a slow subscriber falls behind, which still requires
//! the subscriber to handle `RecvError::Lagged`. Here each subscriber
//! gets its own bounded `mpsc` mailbox; a full or closed mailbox simply
//! drops that subscriber from the set on the next publish, per
//! spec.md §9's broadcast-hub redesign note. A slow listener loses
//! events and, eventually, its subscription — it never blocks the
//! publisher.

use std::sync::Mutex;

use guardian_core::core::timeline::TimelineEvent;
use tokio::sync::mpsc;

/// One timeline event, serialized as JSON with ISO-8601 timestamps
/// (spec.md §4.7).
pub type TimelineEventJson = String;

/// Default per-subscriber mailbox capacity.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 256;

/// Bounded, drop-slow-subscriber fan-out hub for [`TimelineEvent`]s.
#[derive(Default)]
pub struct TimelineHub {
    subscribers: Mutex<Vec<mpsc::Sender<TimelineEventJson>>>,
}

impl TimelineHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber with the default mailbox capacity and
    /// returns its receiver.
    #[must_use]
    pub fn subscribe(&self) -> mpsc::Receiver<TimelineEventJson> {
        self.subscribe_with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Registers a new subscriber with the given mailbox capacity and
    /// returns its receiver.
    #[must_use]
    pub fn subscribe_with_capacity(&self, capacity: usize) -> mpsc::Receiver<TimelineEventJson> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.subscribers().push(tx);
        rx
    }

    /// Returns the number of currently live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Serializes `event` and fans it out to every live subscriber,
    /// dropping any subscriber whose mailbox is full or closed. A
    /// serialization failure is unreachable for a well-formed
    /// `TimelineEvent` but is handled by skipping the publish rather
    /// than panicking.
    pub fn publish(&self, event: &TimelineEvent) {
        let Ok(json) = serde_json::to_string(event) else {
            return;
        };
        self.subscribers().retain(|tx| tx.try_send(json.clone()).is_ok());
    }

    fn subscribers(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::Sender<TimelineEventJson>>> {
        self.subscribers.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use guardian_core::core::identifiers::CameraId;
    use guardian_core::core::identifiers::IncidentId;
    use guardian_core::core::identifiers::TimelineEventId;
    use guardian_core::core::timeline::EventKind;
    use guardian_core::core::timeline::TimelineEvent;

    use super::TimelineHub;

    fn sample_event() -> TimelineEvent {
        TimelineEvent {
            id: TimelineEventId::generate(),
            incident_id: IncidentId::generate(),
            camera_id: CameraId::new("cam-1"),
            kind: EventKind::TriggerReceived,
            ts: time::OffsetDateTime::UNIX_EPOCH,
            payload: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let hub = TimelineHub::new();
        let mut rx = hub.subscribe();
        hub.publish(&sample_event());
        let received = rx.recv().await.expect("event delivered");
        assert!(received.contains("TRIGGER_RECEIVED"));
    }

    #[tokio::test]
    async fn full_mailbox_drops_subscriber_without_blocking_publish() {
        let hub = TimelineHub::new();
        let _rx = hub.subscribe_with_capacity(1);
        hub.publish(&sample_event());
        hub.publish(&sample_event());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_on_next_publish() {
        let hub = TimelineHub::new();
        let rx = hub.subscribe();
        drop(rx);
        hub.publish(&sample_event());
        assert_eq!(hub.subscriber_count(), 0);
    }
}
