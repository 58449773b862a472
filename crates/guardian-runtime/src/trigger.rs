// crates/guardian-runtime/src/trigger.rs
// ============================================================================
// Module: Trigger Router & Dedup
// Description: Prevention telemetry handling and fall/edge/explicit-trigger
// incident creation and dedup.
// Purpose: Turn a raw VisionObservation into either an updated risk score
// (prevention path) or a running IncidentController (trigger path), per
// spec.md §4.6.
// Dependencies: guardian-core, guardian-planner, crate::controller,
// crate::registry, tokio
// ============================================================================

//! ## Overview
//! `TriggerRouter::handle_observation` is the single entry point vision
//! ingestion calls. An observation carrying `trigger: Some(_)` takes the
//! fall/edge path: dedup against any already-ACTIVE incident on the
//! camera, either attaching to it or creating a fresh one and spawning
//! its controller. An observation with `trigger: None` takes the
//! prevention path: a bed-relative posture assessment updates the
//! camera's `risk_score`, and a risk score crossing
//! `risk_threshold_high` triggers one prevention-mode planner call
//! whose approved actions are dispatched directly (there is no open
//! incident to attach them to).
//!
//! The fall/edge path's check-then-create span (read
//! `active_incident_for_camera`, then `put_incident` + spawn + register
//! when none is active) is not atomic at the store layer, so two
//! concurrent observations for the same camera could otherwise both
//! observe no active incident and each create one. `TriggerRouter`
//! closes that window itself with a per-camera lock held across the
//! whole span, rather than relying on incidental serialization by
//! whatever is calling `handle_observation`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use guardian_core::core::camera::Camera;
use guardian_core::core::clock::Clock;
use guardian_core::core::identifiers::CameraId;
use guardian_core::core::identifiers::IncidentId;
use guardian_core::core::incident::Incident;
use guardian_core::core::incident::IncidentStatus;
use guardian_core::core::incident::ActionType;
use guardian_core::core::timeline::EventKind;
use guardian_core::interfaces::BedAssessmentRequest;
use guardian_core::interfaces::Datastore;
use guardian_core::interfaces::Frame;
use guardian_core::interfaces::IncidentStateSnapshot;
use guardian_core::interfaces::NotificationGateway;
use guardian_core::interfaces::PlanIncidentRequest;
use guardian_core::interfaces::Planner;
use guardian_core::interfaces::PlannerMode;
use guardian_core::interfaces::StoreError;
use guardian_core::interfaces::VisionObservation;
use guardian_core::core::severity::risk;
use guardian_core::runtime::guard::GuardContext;
use guardian_core::runtime::guard::SafetyGuard;
use guardian_planner::adapter::PlannerAdapter;

use crate::controller::IncidentController;
use crate::executor::ActionExecutor;
use crate::registry::IncidentControllers;
use crate::timeline::TimelineLogger;

/// Routes vision observations to either the prevention path or the
/// fall/edge/explicit-trigger incident path.
pub struct TriggerRouter {
    store: Arc<dyn Datastore + Send + Sync>,
    gateway: Arc<dyn NotificationGateway + Send + Sync>,
    planner_adapter: Arc<PlannerAdapter>,
    planner: Arc<dyn Planner + Send + Sync>,
    guard: Arc<SafetyGuard>,
    executor: Arc<ActionExecutor>,
    registry: Arc<IncidentControllers>,
    timeline: Arc<TimelineLogger>,
    clock: Arc<dyn Clock + Send + Sync>,
    camera_locks: Mutex<HashMap<CameraId, Arc<Mutex<()>>>>,
}

impl TriggerRouter {
    /// Creates a router wired to the given collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Datastore + Send + Sync>,
        gateway: Arc<dyn NotificationGateway + Send + Sync>,
        planner_adapter: Arc<PlannerAdapter>,
        planner: Arc<dyn Planner + Send + Sync>,
        guard: Arc<SafetyGuard>,
        executor: Arc<ActionExecutor>,
        registry: Arc<IncidentControllers>,
        timeline: Arc<TimelineLogger>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            store,
            gateway,
            planner_adapter,
            planner,
            guard,
            executor,
            registry,
            timeline,
            clock,
            camera_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the per-camera dedup lock for `camera_id`, creating one
    /// if this is the first observation seen for it.
    fn camera_lock(&self, camera_id: &CameraId) -> Arc<Mutex<()>> {
        let mut locks = self.camera_locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(locks.entry(camera_id.clone()).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    /// Routes one observation to the prevention or trigger path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persisting the camera or incident fails.
    pub async fn handle_observation(&self, observation: VisionObservation) -> Result<(), StoreError> {
        if let Some(trigger) = observation.trigger {
            self.handle_trigger(observation, trigger).await
        } else {
            self.handle_prevention_tick(observation).await
        }
    }

    async fn handle_trigger(&self, observation: VisionObservation, trigger: guardian_core::core::incident::TriggerKind) -> Result<(), StoreError> {
        // Held for the entire synchronous check-then-create span below so
        // two concurrent observations for the same camera cannot both
        // observe no active incident and each create one. No `.await`
        // happens while the guard is live; the notification send to an
        // already-running controller happens after it is dropped.
        let camera_lock = self.camera_lock(&observation.camera_id);
        let attach_to = {
            let _guard = camera_lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            self.create_incident_if_absent(&observation, trigger)?
        };

        if let Some(sender) = attach_to {
            let _ = sender.send(crate::controller::ControlMessage::NewTrigger(observation)).await;
        }
        Ok(())
    }

    /// Creates and registers a fresh incident for `observation.camera_id`
    /// unless one is already ACTIVE, in which case it returns the
    /// sender for that incident's running controller so the caller can
    /// forward the new trigger to it. Must only be called while holding
    /// that camera's [`Self::camera_lock`].
    fn create_incident_if_absent(
        &self,
        observation: &VisionObservation,
        trigger: guardian_core::core::incident::TriggerKind,
    ) -> Result<Option<tokio::sync::mpsc::Sender<crate::controller::ControlMessage>>, StoreError> {
        if let Some(existing) = self.store.active_incident_for_camera(&observation.camera_id)? {
            return Ok(self.registry.get(existing.id));
        }

        let Some(camera) = self.store.get_camera(&observation.camera_id)? else {
            return Ok(None);
        };
        let seed = trigger.seed();

        let incident = Incident {
            id: IncidentId::generate(),
            camera_id: camera.id.clone(),
            created_at: self.clock.now(),
            status: IncidentStatus::Active,
            verdict: seed.verdict,
            severity_seed: seed.severity_seed,
            severity_current: seed.severity_seed,
            risk_score: seed.risk_score,
            confidence: seed.confidence.unwrap_or(0.5),
            time_down_s: 0.0,
            acknowledged: false,
            ack_by: None,
            escalation_stage: 0,
            plan_version: 0,
            reasons_current: Vec::new(),
            language: "en".to_string(),
            summary_text: String::new(),
            frames_b64: Vec::new(),
        };
        self.store.put_incident(&incident)?;
        self.emit(incident.id, camera.id.clone(), EventKind::TriggerReceived, &incident);

        let controller = IncidentController::new(
            camera,
            Arc::clone(&self.planner_adapter),
            Arc::clone(&self.planner),
            Arc::clone(&self.guard),
            Arc::clone(&self.executor),
            Arc::clone(&self.store),
            Arc::clone(&self.timeline),
            Arc::clone(&self.clock),
        );
        let incident_id = incident.id;
        let sender = controller.spawn(incident, observation.clone());
        self.registry.register(incident_id, sender);
        Ok(None)
    }

    async fn handle_prevention_tick(&self, observation: VisionObservation) -> Result<(), StoreError> {
        let Some(mut camera) = self.store.get_camera(&observation.camera_id)? else {
            return Ok(());
        };
        if self.store.active_incident_for_camera(&camera.id)?.is_some() {
            return Ok(());
        }

        let frames: Vec<Frame> = observation.frame.into_iter().collect();
        if frames.is_empty() {
            return Ok(());
        }
        let request = BedAssessmentRequest {
            frames,
            bed_polygon: camera.bed_polygon.clone(),
            room_type: camera.room_type,
        };
        let planner = Arc::clone(&self.planner);
        let assessment = match tokio::task::spawn_blocking(move || planner.assess_bed(&request)).await {
            Ok(Ok(assessment)) => assessment,
            _ => return Ok(()),
        };

        let hour = self.clock.now().hour();
        let new_risk = risk(assessment.bed_state, assessment.stability, hour);
        camera.risk_score = new_risk;
        self.store.put_camera(&camera)?;

        let marker_id = IncidentId::generate();
        let mut assessment_payload = serde_json::Map::new();
        assessment_payload.insert("bed_state".to_string(), serde_json::json!(assessment.bed_state));
        assessment_payload.insert("stability".to_string(), serde_json::json!(assessment.stability));
        let _ = self.timeline.log_event(marker_id, camera.id.clone(), EventKind::BedAssessment, assessment_payload);

        let mut risk_payload = serde_json::Map::new();
        risk_payload.insert("risk_score".to_string(), serde_json::json!(new_risk));
        let _ = self.timeline.log_event(marker_id, camera.id.clone(), EventKind::RiskUpdated, risk_payload);

        if new_risk >= camera.config.risk_threshold_high {
            self.run_prevention_plan(&camera, marker_id, observation.motion, observation.stillness).await?;
        }
        Ok(())
    }

    async fn run_prevention_plan(&self, camera: &Camera, marker_id: IncidentId, motion: f64, stillness: f64) -> Result<(), StoreError> {
        let request = PlanIncidentRequest {
            incident_id: None,
            camera_id: camera.id.clone(),
            frames: vec![Frame { bytes: Vec::new() }],
            motion,
            stillness,
            room_type: camera.room_type,
            policy_text: String::new(),
            incident_state: None::<IncidentStateSnapshot>,
            agent_notes: self.store.active_notes_for(Some(&camera.id)).unwrap_or_default(),
            mode: PlannerMode::Prevention,
        };
        let adapter = Arc::clone(&self.planner_adapter);
        let voice_enabled = camera.policy.voice_enabled;
        let draft = tokio::task::spawn_blocking(move || adapter.plan_incident_or_fallback(&request, voice_enabled)).await.unwrap_or_else(|_| guardian_planner::fallback::fallback_plan(motion, voice_enabled));

        let ctx = GuardContext {
            acked: false,
            voice_enabled: camera.policy.voice_enabled,
            sms_enabled: camera.policy.sms_enabled,
            escalation_stage: 0,
            cooldown_contact_s: camera.policy.cooldown_contact_s,
            max_primary_call_attempts: camera.policy.max_primary_call_attempts,
            max_escalation_stage: 2,
        };
        let (approved, _decisions) = self.guard.approve(&draft.actions, &camera.id, &ctx, self.clock.now());

        for action in approved {
            let result = self.dispatch_prevention_action(camera, marker_id, &action.action).await;
            let mut payload = serde_json::Map::new();
            payload.insert("action_type".to_string(), serde_json::json!(action.action));
            payload.insert("result".to_string(), serde_json::json!(result));
            let _ = self.timeline.log_event(marker_id, camera.id.clone(), EventKind::ActionExecuted, payload);
        }
        Ok(())
    }

    /// Dispatches one Guard-approved action from a prevention-mode plan.
    /// The Guard is the sole filter on which action types are allowed
    /// here (spec.md §9's prevention-mode open question): every
    /// variant is dispatched, using `marker_id` in place of an incident
    /// id where one would normally correlate a call. `CLOSE_INCIDENT`
    /// and `REQUEST_STRONG_VERIFY` are no-ops because there is no open
    /// incident for either to act on during prevention telemetry.
    async fn dispatch_prevention_action(&self, camera: &Camera, marker_id: IncidentId, action: &ActionType) -> String {
        const HEADSUP_TEMPLATE: &str = "Heads up: elevated fall risk detected. No action needed unless it recurs.";

        match action {
            ActionType::SendSmsPrimary => self.dispatch_prevention_sms(&camera.primary_contact, HEADSUP_TEMPLATE).await,
            ActionType::SendLowPriorityHeadsup => self.dispatch_prevention_sms(&camera.primary_contact, HEADSUP_TEMPLATE).await,
            ActionType::StartVoiceCallPrimary => self.dispatch_prevention_call(&camera.primary_contact, marker_id).await,
            ActionType::EscalateToBackup => {
                let sms = self.dispatch_prevention_sms(&camera.backup_contact, HEADSUP_TEMPLATE).await;
                let call = self.dispatch_prevention_call(&camera.backup_contact, marker_id).await;
                format!("sms={sms}; call={call}")
            }
            ActionType::IncreaseCheckRate => "prevention tick rate unchanged; no running loop to retune".to_string(),
            ActionType::CancelEscalation => "no-op".to_string(),
            ActionType::CloseIncident => "skipped: no incident open during prevention telemetry".to_string(),
            ActionType::RequestStrongVerify => "skipped: no incident to strong-verify during prevention telemetry".to_string(),
        }
    }

    async fn dispatch_prevention_sms(&self, to: &str, body: &str) -> String {
        let to = to.to_string();
        let body = body.to_string();
        let gateway = Arc::clone(&self.gateway);
        let outcome = tokio::task::spawn_blocking(move || gateway.send_sms(&to, &body)).await;
        match outcome {
            Ok(Ok(external_id)) => external_id,
            Ok(Err(err)) => err.to_string(),
            Err(join_err) => join_err.to_string(),
        }
    }

    async fn dispatch_prevention_call(&self, to: &str, marker_id: IncidentId) -> String {
        let to = to.to_string();
        let gateway = Arc::clone(&self.gateway);
        let outcome = tokio::task::spawn_blocking(move || gateway.start_voice_call(&to, &marker_id)).await;
        match outcome {
            Ok(Ok(external_id)) => external_id,
            Ok(Err(err)) => err.to_string(),
            Err(join_err) => join_err.to_string(),
        }
    }

    fn emit(&self, incident_id: IncidentId, camera_id: guardian_core::core::identifiers::CameraId, kind: EventKind, incident: &Incident) {
        let mut payload = serde_json::Map::new();
        payload.insert("verdict".to_string(), serde_json::json!(incident.verdict));
        payload.insert("severity_seed".to_string(), serde_json::json!(incident.severity_seed));
        let _ = self.timeline.log_event(incident_id, camera_id, kind, payload);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use std::sync::Arc;

    use guardian_core::core::camera::Camera;
    use guardian_core::core::camera::CameraConfig;
    use guardian_core::core::camera::CameraStatus;
    use guardian_core::core::camera::NotificationPolicy;
    use guardian_core::core::camera::RoomType;
    use guardian_core::core::clock::FixedClock;
    use guardian_core::core::identifiers::CameraId;
    use guardian_core::core::incident::TriggerKind;
    use guardian_core::core::incident::Verdict;
    use guardian_core::core::severity::BedState;
    use guardian_core::core::severity::Stability;
    use guardian_core::interfaces::BedAssessment;
    use guardian_core::interfaces::Frame;
    use guardian_core::interfaces::GatewayError;
    use guardian_core::interfaces::NotificationGateway;
    use guardian_core::interfaces::PlannerPlanDraft;
    use guardian_core::interfaces::VisionObservation;
    use guardian_planner::adapter::PlannerAdapter;
    use guardian_planner::fake::FakePlanner;
    use guardian_store::memory::InMemoryStore;
    use time::macros::datetime;

    use super::TriggerRouter;
    use crate::broadcast::TimelineHub;
    use crate::executor::ActionExecutor;
    use crate::registry::IncidentControllers;
    use crate::timeline::TimelineLogger;
    use guardian_core::runtime::guard::SafetyGuard;

    struct SilentGateway;

    impl NotificationGateway for SilentGateway {
        fn send_sms(&self, _to: &str, _body: &str) -> Result<String, GatewayError> {
            Ok("sms-1".to_string())
        }

        fn start_voice_call(&self, _to: &str, _incident_id: &guardian_core::core::identifiers::IncidentId) -> Result<String, GatewayError> {
            Ok("call-1".to_string())
        }
    }

    fn camera(id: &str) -> Camera {
        Camera {
            id: CameraId::new(id),
            name: "Bedroom".to_string(),
            room_type: RoomType::Bedroom,
            bed_polygon: None,
            primary_contact: "+15551234567".to_string(),
            backup_contact: "+15559876543".to_string(),
            voice_enabled: true,
            sms_enabled: true,
            risk_score: 0.0,
            last_seen: None,
            config: CameraConfig::default(),
            status: CameraStatus::Active,
            policy: NotificationPolicy::default(),
        }
    }

    fn router(store: Arc<InMemoryStore>) -> TriggerRouter {
        router_with_registry(store).0
    }

    fn router_with_registry(store: Arc<InMemoryStore>) -> (TriggerRouter, Arc<IncidentControllers>) {
        let clock = Arc::new(FixedClock::new(datetime!(2026-01-01 12:00:00 UTC)));
        let hub = Arc::new(TimelineHub::new());
        let timeline = Arc::new(TimelineLogger::new(store.clone(), hub, clock.clone(), 100));
        let gateway = Arc::new(SilentGateway);
        let draft = PlannerPlanDraft {
            verdict: Verdict::PossibleFall,
            severity_seed: 3,
            confidence: 0.7,
            reasons: vec!["test".to_string()],
            actions: vec![],
            replan_interval_s: 10.0,
        };
        let bed_assessment = BedAssessment {
            bed_state: BedState::InBed,
            stability: Stability::Stable,
        };
        let planner: Arc<dyn guardian_core::interfaces::Planner + Send + Sync> = Arc::new(FakePlanner::new(draft, bed_assessment));
        let planner_adapter = Arc::new(PlannerAdapter::new(Arc::clone(&planner)));
        let guard = Arc::new(SafetyGuard::new());
        let executor = Arc::new(ActionExecutor::new(gateway.clone(), store.clone(), timeline.clone(), clock.clone()));
        let registry = Arc::new(IncidentControllers::new());
        let router = TriggerRouter::new(store, gateway, planner_adapter, planner, guard, executor, registry.clone(), timeline, clock);
        (router, registry)
    }

    #[tokio::test]
    async fn fall_trigger_creates_incident_when_none_active() {
        let store = Arc::new(InMemoryStore::new());
        store.put_camera(&camera("cam-1")).expect("seed camera");
        let router = router(store.clone());

        let observation = VisionObservation {
            camera_id: CameraId::new("cam-1"),
            motion: 0.8,
            stillness: 0.9,
            frame: Some(Frame { bytes: vec![1, 2, 3] }),
            trigger: Some(TriggerKind::Fall),
        };
        router.handle_observation(observation).await.expect("handle");

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let active = store.active_incident_for_camera(&CameraId::new("cam-1")).expect("lookup");
        assert!(active.is_some());
    }

    #[tokio::test]
    async fn second_trigger_on_same_camera_does_not_create_a_second_incident() {
        let store = Arc::new(InMemoryStore::new());
        store.put_camera(&camera("cam-2")).expect("seed camera");
        let router = router(store.clone());

        let observation = |bytes: u8| VisionObservation {
            camera_id: CameraId::new("cam-2"),
            motion: 0.8,
            stillness: 0.9,
            frame: Some(Frame { bytes: vec![bytes] }),
            trigger: Some(TriggerKind::Fall),
        };
        router.handle_observation(observation(1)).await.expect("first");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let first_id = store
            .active_incident_for_camera(&CameraId::new("cam-2"))
            .expect("lookup")
            .expect("incident created")
            .id;

        router.handle_observation(observation(2)).await.expect("second");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let second_id = store
            .active_incident_for_camera(&CameraId::new("cam-2"))
            .expect("lookup")
            .expect("incident still active")
            .id;

        assert_eq!(first_id, second_id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_triggers_on_the_same_camera_create_only_one_incident() {
        let store = Arc::new(InMemoryStore::new());
        store.put_camera(&camera("cam-3")).expect("seed camera");
        let (router, registry) = router_with_registry(store.clone());
        let router = Arc::new(router);

        let observation = |bytes: u8| VisionObservation {
            camera_id: CameraId::new("cam-3"),
            motion: 0.8,
            stillness: 0.9,
            frame: Some(Frame { bytes: vec![bytes] }),
            trigger: Some(TriggerKind::Fall),
        };

        let first = tokio::spawn({
            let router = router.clone();
            async move { router.handle_observation(observation(1)).await }
        });
        let second = tokio::spawn({
            let router = router.clone();
            async move { router.handle_observation(observation(2)).await }
        });
        let (first, second) = tokio::join!(first, second);
        first.expect("first task").expect("first handled");
        second.expect("second task").expect("second handled");

        assert_eq!(registry.len(), 1, "two concurrent triggers for one camera must spawn exactly one controller");
    }
}
