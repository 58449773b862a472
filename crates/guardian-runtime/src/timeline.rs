// crates/guardian-runtime/src/timeline.rs
// ============================================================================
// Module: Timeline Logger
// Description: Durable append, bounded drop-oldest buffer, and broadcast
// fan-out for timeline events.
// Purpose: Give every other module in this crate one call
// (`TimelineLogger::log_event`) that satisfies spec.md §4.7's three-step
// contract without repeating it at each call site.
// Dependencies: guardian-core, crate::broadcast
// ============================================================================

//! ## Overview
//! `log_event` does exactly the three things spec.md §4.7 describes, in
//! order: append to the durable store, enqueue into a bounded
//! drop-oldest buffer awaiting warehouse flush, and fan out to the
//! broadcast hub. A durable-append failure aborts the remaining two
//! steps and is returned to the caller; buffer/broadcast never fail in
//! a way that should interrupt the control loop, so `log_event` itself
//! only ever fails on the store.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use guardian_core::core::clock::Clock;
use guardian_core::core::identifiers::CameraId;
use guardian_core::core::identifiers::IncidentId;
use guardian_core::core::identifiers::TimelineEventId;
use guardian_core::core::timeline::EventKind;
use guardian_core::core::timeline::TimelineEvent;
use guardian_core::interfaces::Datastore;
use guardian_core::interfaces::StoreError;

use crate::broadcast::TimelineHub;

/// Durable append + bounded buffer + broadcast fan-out for timeline events.
pub struct TimelineLogger {
    store: Arc<dyn Datastore + Send + Sync>,
    hub: Arc<TimelineHub>,
    clock: Arc<dyn Clock + Send + Sync>,
    buffer: Mutex<VecDeque<TimelineEvent>>,
    capacity: usize,
}

impl TimelineLogger {
    /// Creates a logger backed by `store`, fanning out through `hub`,
    /// with a drop-oldest buffer of the given `capacity` awaiting
    /// warehouse flush (spec.md §4.7 default: 10,000).
    #[must_use]
    pub fn new(store: Arc<dyn Datastore + Send + Sync>, hub: Arc<TimelineHub>, clock: Arc<dyn Clock + Send + Sync>, capacity: usize) -> Self {
        Self {
            store,
            hub,
            clock,
            buffer: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Returns a handle to the broadcast hub this logger fans events out to.
    #[must_use]
    pub fn hub(&self) -> &Arc<TimelineHub> {
        &self.hub
    }

    /// Appends, buffers, and broadcasts one timeline event, returning
    /// the event that was logged so a caller that needs to mirror it
    /// immediately (e.g. the idle-window config path) does not have to
    /// drain the shared buffer to find it again.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the durable append fails; the buffer
    /// and broadcast steps do not run in that case.
    pub fn log_event(
        &self,
        incident_id: IncidentId,
        camera_id: CameraId,
        kind: EventKind,
        payload: serde_json::Map<String, serde_json::Value>,
    ) -> Result<TimelineEvent, StoreError> {
        let event = TimelineEvent {
            id: TimelineEventId::generate(),
            incident_id,
            camera_id,
            kind,
            ts: self.clock.now(),
            payload,
        };
        self.store.append_timeline_event(&event)?;

        let mut buffer = self.buffer();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(event.clone());
        drop(buffer);

        self.hub.publish(&event);
        Ok(event)
    }

    /// Drains every buffered event awaiting warehouse flush.
    #[must_use]
    pub fn drain_buffer(&self) -> Vec<TimelineEvent> {
        self.buffer().drain(..).collect()
    }

    fn buffer(&self) -> std::sync::MutexGuard<'_, VecDeque<TimelineEvent>> {
        self.buffer.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
