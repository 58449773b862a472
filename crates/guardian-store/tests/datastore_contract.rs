// crates/guardian-store/tests/datastore_contract.rs
// ============================================================================
// Integration test: both Datastore implementations satisfy the same
// camera/incident/plan round-trip contract.
// ============================================================================

use guardian_core::core::camera::Camera;
use guardian_core::core::camera::CameraConfig;
use guardian_core::core::camera::CameraStatus;
use guardian_core::core::camera::NotificationPolicy;
use guardian_core::core::camera::RoomType;
use guardian_core::core::identifiers::CameraId;
use guardian_core::core::identifiers::IncidentId;
use guardian_core::core::identifiers::PlanId;
use guardian_core::core::incident::Incident;
use guardian_core::core::incident::IncidentPlan;
use guardian_core::core::incident::IncidentStatus;
use guardian_core::core::incident::ModelUsed;
use guardian_core::core::incident::Verdict;
use guardian_core::interfaces::Datastore;
use guardian_store::memory::InMemoryStore;
use guardian_store::sqlite::SqliteStore;
use time::macros::datetime;

fn exercise(store: &dyn Datastore) {
    let camera = Camera {
        id: CameraId::new("cam-hallway"),
        name: "Hallway".to_string(),
        room_type: RoomType::Hallway,
        bed_polygon: None,
        primary_contact: "+15550001111".to_string(),
        backup_contact: "+15550002222".to_string(),
        voice_enabled: true,
        sms_enabled: true,
        risk_score: 0.2,
        last_seen: Some(1_700_000_000),
        config: CameraConfig::default(),
        status: CameraStatus::Active,
        policy: NotificationPolicy::default(),
    };
    store.put_camera(&camera).expect("put camera");
    assert_eq!(store.get_camera(&camera.id).expect("get camera"), Some(camera.clone()));
    assert!(store.active_incident_for_camera(&camera.id).expect("no incident yet").is_none());

    let incident = Incident {
        id: IncidentId::generate(),
        camera_id: camera.id.clone(),
        created_at: datetime!(2026-03-01 12:00:00 UTC),
        status: IncidentStatus::Active,
        verdict: Verdict::ConfirmedFall,
        severity_seed: 4,
        severity_current: 4,
        risk_score: 0.9,
        confidence: 0.8,
        time_down_s: 12.0,
        acknowledged: false,
        ack_by: None,
        escalation_stage: 0,
        plan_version: 1,
        reasons_current: vec!["rapid motion drop".to_string()],
        language: "en".to_string(),
        summary_text: "Possible fall detected in the hallway.".to_string(),
        frames_b64: Vec::new(),
    };
    store.put_incident(&incident).expect("put incident");
    let found = store.active_incident_for_camera(&camera.id).expect("lookup").expect("incident present");
    assert_eq!(found.id, incident.id);

    assert!(store.latest_plan(&incident.id).expect("no plan yet").is_none());
    let plan_v1 = IncidentPlan {
        id: PlanId::generate(),
        incident_id: incident.id,
        version: 1,
        model_used: ModelUsed::Fast,
        verdict: Verdict::ConfirmedFall,
        severity_seed: 4,
        confidence: 0.8,
        reasons: vec!["rapid motion drop".to_string()],
        actions: Vec::new(),
        replan_interval_s: 5.0,
        created_at: datetime!(2026-03-01 12:00:01 UTC),
    };
    let plan_v2 = IncidentPlan { version: 2, id: PlanId::generate(), ..plan_v1.clone() };
    store.put_plan(&plan_v1).expect("put plan v1");
    store.put_plan(&plan_v2).expect("put plan v2");
    let latest = store.latest_plan(&incident.id).expect("lookup").expect("plan present");
    assert_eq!(latest.version, 2);
}

#[test]
fn in_memory_store_satisfies_contract() {
    let store = InMemoryStore::new();
    exercise(&store);
}

#[test]
fn sqlite_store_satisfies_contract() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::open(dir.path().join("store.db")).expect("open store");
    exercise(&store);
}
