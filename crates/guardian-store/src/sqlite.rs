// crates/guardian-store/src/sqlite.rs
// ============================================================================
// Module: SQLite Datastore
// Description: `Datastore` implementation backed by a single `SQLite` file.
// Purpose: Provide durable persistence for cameras, incidents, plans, and
// the append-only timeline/action/note/config records spec.md §6 lists.
// Dependencies: guardian-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Each entity is stored as a single canonical JSON blob (`data_json`)
//! next to the narrow columns a query actually filters or orders on
//! (`camera_id`, `status`, `version`, ...). Connection access is
//! serialized through one mutex: this store does not attempt the
//! writer-queue/batching throughput work a multi-tenant service would
//! need (see `DESIGN.md`), since a single caregiver deployment's write
//! rate is bounded by incident/telemetry volume, not concurrent tenants.

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use guardian_core::core::camera::Camera;
use guardian_core::core::clock::Clock;
use guardian_core::core::clock::SystemClock;
use guardian_core::core::identifiers::CameraId;
use guardian_core::core::identifiers::IncidentId;
use guardian_core::core::incident::ActionLog;
use guardian_core::core::incident::Incident;
use guardian_core::core::incident::IncidentPlan;
use guardian_core::core::incident::IncidentStatus;
use guardian_core::core::timeline::AgentNote;
use guardian_core::core::timeline::ConfigUpdate;
use guardian_core::core::timeline::TimelineEvent;
use guardian_core::interfaces::Datastore;
use guardian_core::interfaces::StoreError;
use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OptionalExtension;

use crate::error::SqliteStoreError;
use crate::schema;

/// `SQLite`-backed [`Datastore`].
pub struct SqliteStore {
    connection: Mutex<Connection>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SqliteStore {
    /// Opens (creating if absent) a store at `path`, using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file cannot be opened or the
    /// schema cannot be initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteStoreError> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    /// Opens a store with an injected clock, for deterministic tests.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the file cannot be opened or the
    /// schema cannot be initialized.
    pub fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock + Send + Sync>) -> Result<Self, SqliteStoreError> {
        let connection = schema::open_and_initialize(path.as_ref())?;
        Ok(Self { connection: Mutex::new(connection), clock })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Returns the wire label `IncidentStatus` serializes to.
const fn status_label(status: IncidentStatus) -> &'static str {
    match status {
        IncidentStatus::Active => "ACTIVE",
        IncidentStatus::Acked => "ACKED",
        IncidentStatus::Closed => "CLOSED",
    }
}

impl Datastore for SqliteStore {
    fn get_camera(&self, id: &CameraId) -> Result<Option<Camera>, StoreError> {
        self.get_camera_inner(id).map_err(StoreError::from)
    }

    fn put_camera(&self, camera: &Camera) -> Result<(), StoreError> {
        self.put_camera_inner(camera).map_err(StoreError::from)
    }

    fn active_incident_for_camera(&self, camera_id: &CameraId) -> Result<Option<Incident>, StoreError> {
        self.active_incident_for_camera_inner(camera_id).map_err(StoreError::from)
    }

    fn put_incident(&self, incident: &Incident) -> Result<(), StoreError> {
        self.put_incident_inner(incident).map_err(StoreError::from)
    }

    fn latest_plan(&self, incident_id: &IncidentId) -> Result<Option<IncidentPlan>, StoreError> {
        self.latest_plan_inner(incident_id).map_err(StoreError::from)
    }

    fn put_plan(&self, plan: &IncidentPlan) -> Result<(), StoreError> {
        self.put_plan_inner(plan).map_err(StoreError::from)
    }

    fn put_action_log(&self, log: &ActionLog) -> Result<(), StoreError> {
        self.put_action_log_inner(log).map_err(StoreError::from)
    }

    fn append_timeline_event(&self, event: &TimelineEvent) -> Result<(), StoreError> {
        self.append_timeline_event_inner(event).map_err(StoreError::from)
    }

    fn active_notes_for(&self, camera_id: Option<&CameraId>) -> Result<Vec<AgentNote>, StoreError> {
        self.active_notes_for_inner(camera_id).map_err(StoreError::from)
    }

    fn put_agent_note(&self, note: &AgentNote) -> Result<(), StoreError> {
        self.put_agent_note_inner(note).map_err(StoreError::from)
    }

    fn put_config_update(&self, update: &ConfigUpdate) -> Result<(), StoreError> {
        self.put_config_update_inner(update).map_err(StoreError::from)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.readiness_inner().map_err(StoreError::from)
    }
}

impl SqliteStore {
    fn get_camera_inner(&self, id: &CameraId) -> Result<Option<Camera>, SqliteStoreError> {
        let conn = self.conn();
        let row: Option<Vec<u8>> = conn
            .query_row("SELECT data_json FROM cameras WHERE id = ?1", params![id.as_str()], |row| row.get(0))
            .optional()?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(SqliteStoreError::from)).transpose()
    }

    fn put_camera_inner(&self, camera: &Camera) -> Result<(), SqliteStoreError> {
        let data = serde_json::to_vec(camera)?;
        self.conn().execute(
            "INSERT INTO cameras (id, data_json) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET data_json = excluded.data_json",
            params![camera.id.as_str(), data],
        )?;
        Ok(())
    }

    fn active_incident_for_camera_inner(&self, camera_id: &CameraId) -> Result<Option<Incident>, SqliteStoreError> {
        let conn = self.conn();
        let row: Option<Vec<u8>> = conn
            .query_row(
                "SELECT data_json FROM incidents WHERE camera_id = ?1 AND status = ?2 LIMIT 1",
                params![camera_id.as_str(), status_label(IncidentStatus::Active)],
                |row| row.get(0),
            )
            .optional()?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(SqliteStoreError::from)).transpose()
    }

    fn put_incident_inner(&self, incident: &Incident) -> Result<(), SqliteStoreError> {
        let data = serde_json::to_vec(incident)?;
        self.conn().execute(
            "INSERT INTO incidents (id, camera_id, status, data_json) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                camera_id = excluded.camera_id,
                status = excluded.status,
                data_json = excluded.data_json",
            params![incident.id.to_string(), incident.camera_id.as_str(), status_label(incident.status), data],
        )?;
        Ok(())
    }

    fn latest_plan_inner(&self, incident_id: &IncidentId) -> Result<Option<IncidentPlan>, SqliteStoreError> {
        let conn = self.conn();
        let row: Option<Vec<u8>> = conn
            .query_row(
                "SELECT data_json FROM incident_plans WHERE incident_id = ?1 ORDER BY version DESC LIMIT 1",
                params![incident_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        row.map(|bytes| serde_json::from_slice(&bytes).map_err(SqliteStoreError::from)).transpose()
    }

    fn put_plan_inner(&self, plan: &IncidentPlan) -> Result<(), SqliteStoreError> {
        let data = serde_json::to_vec(plan)?;
        self.conn().execute(
            "INSERT INTO incident_plans (id, incident_id, version, data_json) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET data_json = excluded.data_json",
            params![plan.id.to_string(), plan.incident_id.to_string(), plan.version, data],
        )?;
        Ok(())
    }

    fn put_action_log_inner(&self, log: &ActionLog) -> Result<(), SqliteStoreError> {
        let data = serde_json::to_vec(log)?;
        self.conn().execute(
            "INSERT INTO action_logs (id, incident_id, data_json) VALUES (?1, ?2, ?3)",
            params![log.id.to_string(), log.incident_id.to_string(), data],
        )?;
        Ok(())
    }

    fn append_timeline_event_inner(&self, event: &TimelineEvent) -> Result<(), SqliteStoreError> {
        let data = serde_json::to_vec(event)?;
        self.conn().execute(
            "INSERT INTO timeline_events (id, incident_id, data_json) VALUES (?1, ?2, ?3)",
            params![event.id.to_string(), event.incident_id.to_string(), data],
        )?;
        Ok(())
    }

    fn active_notes_for_inner(&self, camera_id: Option<&CameraId>) -> Result<Vec<AgentNote>, SqliteStoreError> {
        let conn = self.conn();
        let mut rows: Vec<Vec<u8>> = Vec::new();
        match camera_id {
            Some(id) => {
                let mut stmt =
                    conn.prepare("SELECT data_json FROM agent_notes WHERE camera_id = ?1 OR camera_id IS NULL")?;
                let mapped = stmt.query_map(params![id.as_str()], |row| row.get(0))?;
                for item in mapped {
                    rows.push(item?);
                }
            }
            None => {
                let mut stmt = conn.prepare("SELECT data_json FROM agent_notes WHERE camera_id IS NULL")?;
                let mapped = stmt.query_map([], |row| row.get(0))?;
                for item in mapped {
                    rows.push(item?);
                }
            }
        }
        drop(conn);
        let now = self.clock.now();
        let mut notes = Vec::with_capacity(rows.len());
        for bytes in rows {
            let note: AgentNote = serde_json::from_slice(&bytes)?;
            if note.is_active(now) {
                notes.push(note);
            }
        }
        Ok(notes)
    }

    fn put_agent_note_inner(&self, note: &AgentNote) -> Result<(), SqliteStoreError> {
        let data = serde_json::to_vec(note)?;
        let camera_id = note.camera_id.as_ref().map(CameraId::as_str);
        self.conn().execute(
            "INSERT INTO agent_notes (id, camera_id, expires_at, data_json) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                camera_id = excluded.camera_id,
                expires_at = excluded.expires_at,
                data_json = excluded.data_json",
            params![note.id.to_string(), camera_id, note.expires_at.to_string(), data],
        )?;
        Ok(())
    }

    fn put_config_update_inner(&self, update: &ConfigUpdate) -> Result<(), SqliteStoreError> {
        let data = serde_json::to_vec(update)?;
        self.conn().execute(
            "INSERT INTO config_updates (camera_id, data_json) VALUES (?1, ?2)",
            params![update.camera_id.as_str(), data],
        )?;
        Ok(())
    }

    fn readiness_inner(&self) -> Result<(), SqliteStoreError> {
        self.conn().query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use guardian_core::core::camera::Camera;
    use guardian_core::core::camera::CameraConfig;
    use guardian_core::core::camera::CameraStatus;
    use guardian_core::core::camera::NotificationPolicy;
    use guardian_core::core::camera::RoomType;
    use guardian_core::core::identifiers::AgentNoteId;
    use guardian_core::core::identifiers::CameraId;
    use guardian_core::core::identifiers::IncidentId;
    use guardian_core::core::identifiers::PlanId;
    use guardian_core::core::incident::Incident;
    use guardian_core::core::incident::IncidentPlan;
    use guardian_core::core::incident::IncidentStatus;
    use guardian_core::core::incident::ModelUsed;
    use guardian_core::core::incident::Verdict;
    use guardian_core::core::timeline::AgentNote;
    use guardian_core::core::timeline::NotePriority;
    use guardian_core::interfaces::Datastore;
    use time::macros::datetime;

    use super::SqliteStore;

    fn sample_camera(id: &str) -> Camera {
        Camera {
            id: CameraId::new(id),
            name: "Bedroom".to_string(),
            room_type: RoomType::Bedroom,
            bed_polygon: None,
            primary_contact: "+15551230000".to_string(),
            backup_contact: "+15551230001".to_string(),
            voice_enabled: true,
            sms_enabled: true,
            risk_score: 0.1,
            last_seen: None,
            config: CameraConfig::default(),
            status: CameraStatus::Active,
            policy: NotificationPolicy::default(),
        }
    }

    fn sample_incident(camera_id: CameraId, status: IncidentStatus) -> Incident {
        Incident {
            id: IncidentId::generate(),
            camera_id,
            created_at: datetime!(2026-01-01 00:00:00 UTC),
            status,
            verdict: Verdict::PossibleFall,
            severity_seed: 3,
            severity_current: 3,
            risk_score: 0.6,
            confidence: 0.65,
            time_down_s: 0.0,
            acknowledged: false,
            ack_by: None,
            escalation_stage: 0,
            plan_version: 0,
            reasons_current: Vec::new(),
            language: "en".to_string(),
            summary_text: String::new(),
            frames_b64: Vec::new(),
        }
    }

    #[test]
    fn camera_round_trips_through_sqlite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteStore::open(dir.path().join("store.db")).expect("open store");
        let camera = sample_camera("cam-1");
        store.put_camera(&camera).expect("put camera");
        let loaded = store.get_camera(&camera.id).expect("get camera").expect("camera present");
        assert_eq!(loaded, camera);
    }

    #[test]
    fn active_incident_lookup_ignores_closed_incidents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteStore::open(dir.path().join("store.db")).expect("open store");
        let camera_id = CameraId::new("cam-1");
        let closed = sample_incident(camera_id.clone(), IncidentStatus::Closed);
        store.put_incident(&closed).expect("put closed incident");
        assert!(store.active_incident_for_camera(&camera_id).expect("lookup").is_none());

        let active = sample_incident(camera_id.clone(), IncidentStatus::Active);
        store.put_incident(&active).expect("put active incident");
        let found = store.active_incident_for_camera(&camera_id).expect("lookup").expect("incident present");
        assert_eq!(found.id, active.id);
    }

    #[test]
    fn latest_plan_returns_highest_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SqliteStore::open(dir.path().join("store.db")).expect("open store");
        let incident_id = IncidentId::generate();
        for version in 1 ..= 3 {
            let plan = IncidentPlan {
                id: PlanId::generate(),
                incident_id,
                version,
                model_used: ModelUsed::Fast,
                verdict: Verdict::PossibleFall,
                severity_seed: 3,
                confidence: 0.7,
                reasons: Vec::new(),
                actions: Vec::new(),
                replan_interval_s: 5.0,
                created_at: datetime!(2026-01-01 00:00:00 UTC),
            };
            store.put_plan(&plan).expect("put plan");
        }
        let latest = store.latest_plan(&incident_id).expect("lookup").expect("plan present");
        assert_eq!(latest.version, 3);
    }

    #[test]
    fn active_notes_for_includes_global_and_excludes_expired() {
        let dir = tempfile::tempdir().expect("tempdir");
        let clock = std::sync::Arc::new(guardian_core::core::clock::FixedClock::new(datetime!(2026-06-01 00:00:00 UTC)));
        let store = SqliteStore::open_with_clock(dir.path().join("store.db"), clock).expect("open store");
        let camera_id = CameraId::new("cam-1");

        let global_note = AgentNote {
            id: AgentNoteId::generate(),
            camera_id: None,
            body: "global note".to_string(),
            priority: NotePriority::Normal,
            watchlist: Vec::new(),
            summary: "global".to_string(),
            expires_at: datetime!(2026-12-31 00:00:00 UTC),
            created_at: datetime!(2026-01-01 00:00:00 UTC),
        };
        let expired_note = AgentNote {
            id: AgentNoteId::generate(),
            camera_id: Some(camera_id.clone()),
            body: "stale note".to_string(),
            priority: NotePriority::Low,
            watchlist: Vec::new(),
            summary: "stale".to_string(),
            expires_at: datetime!(2026-01-01 00:00:00 UTC),
            created_at: datetime!(2025-12-01 00:00:00 UTC),
        };
        store.put_agent_note(&global_note).expect("put global note");
        store.put_agent_note(&expired_note).expect("put expired note");

        let notes = store.active_notes_for(Some(&camera_id)).expect("lookup");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, global_note.id);
    }
}
