// crates/guardian-runtime/src/registry.rs
// ============================================================================
// Module: Incident Controller Registry
// Description: In-process directory of running IncidentController tasks.
// Purpose: Let the trigger router find the ControlMessage sender for an
// already-ACTIVE incident without threading one through every call site,
// per spec.md §9's broadcast-hub-adjacent registry redesign note.
// Dependencies: guardian-core, tokio
// ============================================================================

//! ## Overview
//! One process runs any number of [`crate::controller::IncidentController`]
//! tasks, each owning exactly one ACTIVE incident. `IncidentControllers`
//! is the shared map from an incident's id to the `mpsc::Sender` the
//! rest of the runtime uses to talk to it. Registration and removal are
//! both idempotent: registering twice replaces the old sender, and
//! removing an unknown incident is a no-op, since a controller task may
//! finish and deregister itself concurrently with a late-arriving
//! trigger.

use std::collections::HashMap;
use std::sync::Mutex;

use guardian_core::core::identifiers::IncidentId;
use tokio::sync::mpsc;

use crate::controller::ControlMessage;

/// Shared directory of running incident controller tasks.
#[derive(Default)]
pub struct IncidentControllers {
    senders: Mutex<HashMap<IncidentId, mpsc::Sender<ControlMessage>>>,
}

impl IncidentControllers {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sender` as the channel for `incident_id`, replacing
    /// any prior registration for the same incident.
    pub fn register(&self, incident_id: IncidentId, sender: mpsc::Sender<ControlMessage>) {
        self.senders().insert(incident_id, sender);
    }

    /// Returns the channel for `incident_id`, if a controller task is
    /// currently registered for it.
    #[must_use]
    pub fn get(&self, incident_id: IncidentId) -> Option<mpsc::Sender<ControlMessage>> {
        self.senders().get(&incident_id).cloned()
    }

    /// Removes the registration for `incident_id`. A no-op if none
    /// exists.
    pub fn remove(&self, incident_id: IncidentId) {
        self.senders().remove(&incident_id);
    }

    /// Returns the number of currently registered controller tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.senders().len()
    }

    /// Returns whether the registry currently holds no controllers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.senders().is_empty()
    }

    fn senders(&self) -> std::sync::MutexGuard<'_, HashMap<IncidentId, mpsc::Sender<ControlMessage>>> {
        self.senders.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use guardian_core::core::identifiers::IncidentId;
    use tokio::sync::mpsc;

    use super::IncidentControllers;

    #[tokio::test]
    async fn register_then_get_returns_the_same_sender() {
        let registry = IncidentControllers::new();
        let incident_id = IncidentId::generate();
        let (tx, _rx) = mpsc::channel(1);
        registry.register(incident_id, tx);
        assert!(registry.get(incident_id).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn removing_unknown_incident_is_a_no_op() {
        let registry = IncidentControllers::new();
        registry.remove(IncidentId::generate());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn re_registering_replaces_the_prior_sender() {
        let registry = IncidentControllers::new();
        let incident_id = IncidentId::generate();
        let (tx1, _rx1) = mpsc::channel(1);
        let (tx2, mut rx2) = mpsc::channel(1);
        registry.register(incident_id, tx1);
        registry.register(incident_id, tx2);
        assert_eq!(registry.len(), 1);
        let sender = registry.get(incident_id).expect("registered");
        sender.send(super::ControlMessage::FalseAlarm).await.expect("send");
        assert!(rx2.recv().await.is_some());
    }
}
