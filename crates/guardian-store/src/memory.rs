// crates/guardian-store/src/memory.rs
// ============================================================================
// Module: In-Memory Datastore
// Description: `Datastore` implementation backed by in-process maps.
// Purpose: Back unit tests and the CLI demo without a filesystem.
// Dependencies: guardian-core
// ============================================================================

//! ## Overview
//! [`InMemoryStore`] mirrors [`crate::sqlite::SqliteStore`]'s semantics
//! (one active incident per camera by construction of the caller, latest
//! plan by version, active notes filtered by an injected clock) without
//! touching disk. Collections are guarded by the same poison-tolerant
//! mutex pattern used throughout this workspace.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use guardian_core::core::camera::Camera;
use guardian_core::core::clock::Clock;
use guardian_core::core::clock::SystemClock;
use guardian_core::core::identifiers::CameraId;
use guardian_core::core::identifiers::IncidentId;
use guardian_core::core::incident::ActionLog;
use guardian_core::core::incident::Incident;
use guardian_core::core::incident::IncidentPlan;
use guardian_core::core::timeline::AgentNote;
use guardian_core::core::timeline::ConfigUpdate;
use guardian_core::core::timeline::TimelineEvent;
use guardian_core::interfaces::Datastore;
use guardian_core::interfaces::StoreError;

#[derive(Default)]
struct Tables {
    cameras: HashMap<CameraId, Camera>,
    incidents: HashMap<IncidentId, Incident>,
    plans: HashMap<IncidentId, Vec<IncidentPlan>>,
    action_logs: Vec<ActionLog>,
    timeline_events: Vec<TimelineEvent>,
    notes: Vec<AgentNote>,
    config_updates: Vec<ConfigUpdate>,
}

/// In-memory [`Datastore`] for tests and the CLI demo.
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store with an injected clock, for deterministic tests.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { tables: Mutex::new(Tables::default()), clock }
    }

    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Datastore for InMemoryStore {
    fn get_camera(&self, id: &CameraId) -> Result<Option<Camera>, StoreError> {
        Ok(self.tables().cameras.get(id).cloned())
    }

    fn put_camera(&self, camera: &Camera) -> Result<(), StoreError> {
        self.tables().cameras.insert(camera.id.clone(), camera.clone());
        Ok(())
    }

    fn active_incident_for_camera(&self, camera_id: &CameraId) -> Result<Option<Incident>, StoreError> {
        Ok(self.tables().incidents.values().find(|incident| incident.camera_id == *camera_id && incident.is_active()).cloned())
    }

    fn put_incident(&self, incident: &Incident) -> Result<(), StoreError> {
        self.tables().incidents.insert(incident.id, incident.clone());
        Ok(())
    }

    fn latest_plan(&self, incident_id: &IncidentId) -> Result<Option<IncidentPlan>, StoreError> {
        Ok(self.tables().plans.get(incident_id).and_then(|plans| plans.iter().max_by_key(|plan| plan.version).cloned()))
    }

    fn put_plan(&self, plan: &IncidentPlan) -> Result<(), StoreError> {
        self.tables().plans.entry(plan.incident_id).or_default().push(plan.clone());
        Ok(())
    }

    fn put_action_log(&self, log: &ActionLog) -> Result<(), StoreError> {
        self.tables().action_logs.push(log.clone());
        Ok(())
    }

    fn append_timeline_event(&self, event: &TimelineEvent) -> Result<(), StoreError> {
        self.tables().timeline_events.push(event.clone());
        Ok(())
    }

    fn active_notes_for(&self, camera_id: Option<&CameraId>) -> Result<Vec<AgentNote>, StoreError> {
        let now = self.clock.now();
        let notes = self
            .tables()
            .notes
            .iter()
            .filter(|note| note.is_active(now))
            .filter(|note| match (&note.camera_id, camera_id) {
                (None, _) => true,
                (Some(note_camera), Some(requested)) => note_camera == requested,
                (Some(_), None) => false,
            })
            .cloned()
            .collect();
        Ok(notes)
    }

    fn put_agent_note(&self, note: &AgentNote) -> Result<(), StoreError> {
        self.tables().notes.push(note.clone());
        Ok(())
    }

    fn put_config_update(&self, update: &ConfigUpdate) -> Result<(), StoreError> {
        self.tables().config_updates.push(update.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use guardian_core::core::identifiers::AgentNoteId;
    use guardian_core::core::identifiers::CameraId;
    use guardian_core::core::timeline::AgentNote;
    use guardian_core::core::timeline::NotePriority;
    use guardian_core::interfaces::Datastore;
    use time::macros::datetime;

    use super::InMemoryStore;

    #[test]
    fn global_note_applies_to_every_camera() {
        let store = InMemoryStore::with_clock(std::sync::Arc::new(guardian_core::core::clock::FixedClock::new(
            datetime!(2026-06-01 00:00:00 UTC),
        )));
        let note = AgentNote {
            id: AgentNoteId::generate(),
            camera_id: None,
            body: "watch gait".to_string(),
            priority: NotePriority::Normal,
            watchlist: Vec::new(),
            summary: "gait watch".to_string(),
            expires_at: datetime!(2026-12-31 00:00:00 UTC),
            created_at: datetime!(2026-01-01 00:00:00 UTC),
        };
        store.put_agent_note(&note).expect("put note");
        let notes = store.active_notes_for(Some(&CameraId::new("cam-1"))).expect("lookup");
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn camera_scoped_note_is_excluded_for_other_cameras() {
        let store = InMemoryStore::new();
        let note = AgentNote {
            id: AgentNoteId::generate(),
            camera_id: Some(CameraId::new("cam-1")),
            body: "camera-specific".to_string(),
            priority: NotePriority::Normal,
            watchlist: Vec::new(),
            summary: "specific".to_string(),
            expires_at: datetime!(2099-01-01 00:00:00 UTC),
            created_at: datetime!(2026-01-01 00:00:00 UTC),
        };
        store.put_agent_note(&note).expect("put note");
        let notes = store.active_notes_for(Some(&CameraId::new("cam-2"))).expect("lookup");
        assert!(notes.is_empty());
    }
}
