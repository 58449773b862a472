// crates/guardian-runtime/src/controller.rs
// ============================================================================
// Module: Incident Controller
// Description: Per-incident state machine: replan loop, severity ticker,
// ack/false-alarm/trigger handling, time-based escalation, strong-verify.
// Purpose: Own one Incident end to end, from its first plan through ACK or
// CLOSED, per spec.md §4.5.
// Dependencies: guardian-core, guardian-planner, tokio
// ============================================================================

//! ## Overview
//! One [`IncidentController`] task runs per ACTIVE incident, multiplexing
//! a replan deadline and a fixed 1-second severity tick inside a single
//! `tokio::select!`, plus inbound [`ControlMessage`]s (ack, false alarm,
//! new trigger, strong-verify result). Both timers are tracked as
//! `tokio::time::Instant` deadlines that only advance when their own
//! branch fires, so a long replan interval never gets starved by a
//! short one resetting it on every iteration. Cancellation is implicit:
//! the loop exits as soon as the incident leaves `ACTIVE`, and a closed
//! message channel is treated the same way.

use std::sync::Arc;
use std::time::Duration;

use guardian_core::core::camera::Camera;
use guardian_core::core::clock::Clock;
use guardian_core::core::identifiers::CameraId;
use guardian_core::core::identifiers::IncidentId;
use guardian_core::core::incident::ActionType;
use guardian_core::core::incident::Incident;
use guardian_core::core::incident::IncidentPlan;
use guardian_core::core::incident::IncidentStatus;
use guardian_core::core::incident::ModelUsed;
use guardian_core::core::incident::PlanAction;
use guardian_core::core::incident::Verdict;
use guardian_core::core::incident::needs_strong_verify;
use guardian_core::core::severity::severity;
use guardian_core::core::timeline::EventKind;
use guardian_core::interfaces::Datastore;
use guardian_core::interfaces::Frame;
use guardian_core::interfaces::IncidentStateSnapshot;
use guardian_core::interfaces::PlanIncidentRequest;
use guardian_core::interfaces::PlanStrongRequest;
use guardian_core::interfaces::Planner;
use guardian_core::interfaces::PlannerMode;
use guardian_core::interfaces::PlannerPlanDraft;
use guardian_core::interfaces::StoreError;
use guardian_core::interfaces::VisionObservation;
use guardian_core::runtime::guard::GuardContext;
use guardian_core::runtime::guard::SafetyGuard;
use guardian_planner::adapter::PlannerAdapter;
use guardian_planner::fallback::fallback_plan;
use guardian_planner::metadata::assign_plan_metadata;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant as TokioInstant;

use crate::executor::ActionExecutor;
use crate::timeline::TimelineLogger;

/// Severity ticker cadence, spec.md §4.5 (always 1.0 s, never adapted to
/// real elapsed time; see spec.md §9's open question on this).
const SEVERITY_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Inbound control messages routed to a running [`IncidentController`].
#[derive(Debug)]
pub enum ControlMessage {
    /// A caregiver acknowledged the incident.
    Ack {
        /// Identifier of the acknowledging caregiver/channel.
        by: String,
    },
    /// A caregiver marked the incident a false alarm.
    FalseAlarm,
    /// A new observation arrived for this incident's camera.
    NewTrigger(VisionObservation),
    /// A one-shot strong-verify task completed.
    StrongVerifyResult(PlannerPlanDraft),
}

/// Errors internal to plan persistence; logged by the caller and never
/// allowed to terminate the controller task (spec.md §7).
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Persisting a plan, incident, or timeline event failed.
    #[error("controller store error: {0}")]
    Store(#[from] StoreError),
}

/// Distinguishes which timeline event a plan cycle emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlanCycleKind {
    /// The incident's first plan, or a plan produced by a new trigger.
    Created,
    /// A plan produced by the periodic replan loop.
    Replan,
}

impl PlanCycleKind {
    const fn event_kind(self) -> EventKind {
        match self {
            Self::Created => EventKind::PlanCreated,
            Self::Replan => EventKind::Replan,
        }
    }
}

/// Owns one ACTIVE incident from its first plan through a terminal state.
pub struct IncidentController {
    camera: Camera,
    planner_adapter: Arc<PlannerAdapter>,
    planner: Arc<dyn Planner + Send + Sync>,
    guard: Arc<SafetyGuard>,
    executor: Arc<ActionExecutor>,
    store: Arc<dyn Datastore + Send + Sync>,
    timeline: Arc<TimelineLogger>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl IncidentController {
    /// Creates a controller for `camera`, dispatching planner calls
    /// through `planner_adapter`/`planner`, admission through `guard`,
    /// actions through `executor`, persistence through `store`, and
    /// logging through `timeline`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        camera: Camera,
        planner_adapter: Arc<PlannerAdapter>,
        planner: Arc<dyn Planner + Send + Sync>,
        guard: Arc<SafetyGuard>,
        executor: Arc<ActionExecutor>,
        store: Arc<dyn Datastore + Send + Sync>,
        timeline: Arc<TimelineLogger>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            camera,
            planner_adapter,
            planner,
            guard,
            executor,
            store,
            timeline,
            clock,
        }
    }

    /// Spawns the controller task for `incident`, seeded by the
    /// observation that created it, and returns the sender other
    /// components use to route messages to it.
    #[must_use]
    pub fn spawn(self, incident: Incident, seed_observation: VisionObservation) -> mpsc::Sender<ControlMessage> {
        let (tx, rx) = mpsc::channel(64);
        let self_tx = tx.clone();
        tokio::spawn(async move {
            self.run(incident, seed_observation, rx, self_tx).await;
        });
        tx
    }

    async fn run(self, mut incident: Incident, seed_observation: VisionObservation, mut rx: mpsc::Receiver<ControlMessage>, self_tx: mpsc::Sender<ControlMessage>) {
        let mut motion = seed_observation.motion;
        let mut stillness = seed_observation.stillness;
        let mut recent_frames: Vec<Frame> = seed_observation.frame.into_iter().collect();
        let mut tick_count: u64 = 0;
        let mut replan_interval_s = self.camera.config.check_interval_s.max(1.0);

        match self.run_plan_cycle(&mut incident, PlanCycleKind::Created, &recent_frames, motion, stillness, &self_tx).await {
            Ok(interval_s) => replan_interval_s = interval_s,
            Err(_err) => {}
        }

        let mut next_replan = TokioInstant::now() + Duration::from_secs_f64(replan_interval_s);
        let mut next_severity = TokioInstant::now() + SEVERITY_TICK_INTERVAL;

        loop {
            if incident.status != IncidentStatus::Active {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep_until(next_replan) => {
                    if let Ok(interval_s) = self.run_plan_cycle(&mut incident, PlanCycleKind::Replan, &recent_frames, motion, stillness, &self_tx).await {
                        replan_interval_s = interval_s;
                    }
                    self.check_time_based_escalation(&mut incident).await;
                    next_replan = TokioInstant::now() + Duration::from_secs_f64(replan_interval_s);
                }
                () = tokio::time::sleep_until(next_severity) => {
                    tick_count += 1;
                    let previous_severity = incident.severity_current;
                    incident.time_down_s += 1.0;
                    incident.severity_current = severity(incident.severity_seed, incident.time_down_s, stillness, motion, incident.acknowledged);
                    incident.summary_text = summary(&incident);
                    if incident.severity_current != previous_severity || tick_count % 5 == 0 {
                        self.emit(incident.id, EventKind::SeverityTick, &incident);
                    }
                    let _ = self.store.put_incident(&incident);
                    next_severity = TokioInstant::now() + SEVERITY_TICK_INTERVAL;
                }
                message = rx.recv() => {
                    match message {
                        Some(ControlMessage::Ack { by }) => {
                            incident.status = IncidentStatus::Acked;
                            incident.acknowledged = true;
                            incident.ack_by = Some(by);
                            self.guard.reset(&incident.camera_id);
                            self.emit(incident.id, EventKind::AckReceived, &incident);
                            let _ = self.store.put_incident(&incident);
                            break;
                        }
                        Some(ControlMessage::FalseAlarm) => {
                            incident.status = IncidentStatus::Closed;
                            incident.verdict = Verdict::FalseAlarm;
                            incident.acknowledged = true;
                            self.guard.reset(&incident.camera_id);
                            self.emit(incident.id, EventKind::Closed, &incident);
                            let _ = self.store.put_incident(&incident);
                            break;
                        }
                        Some(ControlMessage::NewTrigger(observation)) => {
                            motion = observation.motion;
                            stillness = observation.stillness;
                            if let Some(frame) = observation.frame {
                                recent_frames.push(frame);
                                if recent_frames.len() > 4 {
                                    recent_frames.remove(0);
                                }
                            }
                            if let Ok(interval_s) = self.run_plan_cycle(&mut incident, PlanCycleKind::Created, &recent_frames, motion, stillness, &self_tx).await {
                                replan_interval_s = interval_s;
                                next_replan = TokioInstant::now() + Duration::from_secs_f64(replan_interval_s);
                            }
                        }
                        Some(ControlMessage::StrongVerifyResult(draft)) => {
                            let _ = self.apply_strong_verify(&mut incident, draft).await;
                        }
                        None => break,
                    }
                }
            }
        }
    }

    /// Runs one "new plan" transition: query the planner, persist the
    /// new plan version, admit its actions through the guard, and
    /// execute the approved subset. Returns the replan cadence to use
    /// until the next cycle.
    #[allow(clippy::too_many_arguments)]
    async fn run_plan_cycle(&self, incident: &mut Incident, kind: PlanCycleKind, frames: &[Frame], motion: f64, stillness: f64, self_tx: &mpsc::Sender<ControlMessage>) -> Result<f64, ControllerError> {
        let request = PlanIncidentRequest {
            incident_id: Some(incident.id),
            camera_id: incident.camera_id.clone(),
            frames: non_empty_frames(frames),
            motion,
            stillness,
            room_type: self.camera.room_type,
            policy_text: policy_text(&self.camera),
            incident_state: Some(IncidentStateSnapshot {
                verdict: incident.verdict,
                severity_current: incident.severity_current,
                escalation_stage: incident.escalation_stage,
                time_down_s: incident.time_down_s,
                acknowledged: incident.acknowledged,
            }),
            agent_notes: self.store.active_notes_for(Some(&incident.camera_id)).unwrap_or_default(),
            mode: PlannerMode::Incident,
        };

        let adapter = Arc::clone(&self.planner_adapter);
        let voice_enabled = self.camera.policy.voice_enabled;
        let draft = tokio::task::spawn_blocking(move || adapter.plan_incident_or_fallback(&request, voice_enabled))
            .await
            .unwrap_or_else(|_| fallback_plan(motion, voice_enabled));

        incident.plan_version += 1;
        incident.verdict = draft.verdict;
        incident.confidence = draft.confidence;
        incident.reasons_current = draft.reasons.clone();
        incident.summary_text = summary(incident);

        let plan = assign_plan_metadata(draft.clone(), incident.id, incident.plan_version, ModelUsed::Fast, self.clock.now());
        self.store.put_plan(&plan)?;
        self.emit(incident.id, kind.event_kind(), incident);

        let ctx = self.guard_context(incident);
        let (approved, _decisions) = self.guard.approve(&draft.actions, &incident.camera_id, &ctx, self.clock.now());
        self.emit(incident.id, EventKind::PlanApproved, incident);

        let outcome = self
            .executor
            .execute(incident.clone(), approved, &self.camera.primary_contact, &self.camera.backup_contact)
            .await
            .map_err(|_| ControllerError::Store(StoreError::Store("action execution failed".to_string())))?;
        *incident = outcome.incident;

        if outcome.strong_verify_requested || needs_strong_verify(draft.verdict, draft.severity_seed, draft.confidence) {
            self.spawn_strong_verify(incident, frames, motion, stillness, plan, self_tx.clone());
        }

        Ok(outcome.requested_replan_interval_s.unwrap_or(plan.replan_interval_s))
    }

    fn spawn_strong_verify(&self, incident: &Incident, frames: &[Frame], motion: f64, stillness: f64, current_plan: IncidentPlan, self_tx: mpsc::Sender<ControlMessage>) {
        let planner = Arc::clone(&self.planner);
        let request = PlanStrongRequest {
            frames: non_empty_frames(frames),
            motion,
            stillness,
            current_plan,
            incident_state: IncidentStateSnapshot {
                verdict: incident.verdict,
                severity_current: incident.severity_current,
                escalation_stage: incident.escalation_stage,
                time_down_s: incident.time_down_s,
                acknowledged: incident.acknowledged,
            },
        };
        tokio::spawn(async move {
            let outcome = tokio::task::spawn_blocking(move || planner.plan_strong(&request)).await;
            if let Ok(Ok(draft)) = outcome {
                let _ = self_tx.send(ControlMessage::StrongVerifyResult(draft)).await;
            }
        });
    }

    async fn apply_strong_verify(&self, incident: &mut Incident, draft: PlannerPlanDraft) -> Result<(), ControllerError> {
        incident.plan_version += 1;
        incident.verdict = draft.verdict;
        incident.confidence = draft.confidence;
        incident.reasons_current = draft.reasons.clone();
        incident.summary_text = summary(incident);
        let plan = assign_plan_metadata(draft, incident.id, incident.plan_version, ModelUsed::Strong, self.clock.now());
        self.store.put_plan(&plan)?;
        self.emit(incident.id, EventKind::PlanCreated, incident);
        self.store.put_incident(incident)?;
        Ok(())
    }

    async fn check_time_based_escalation(&self, incident: &mut Incident) {
        if incident.acknowledged || incident.escalation_stage >= 2 {
            return;
        }
        if incident.time_down_s <= self.camera.policy.escalation_delay_s {
            return;
        }
        let action = PlanAction::immediate(ActionType::EscalateToBackup);
        let ctx = self.guard_context(incident);
        let (approved, _) = self.guard.approve(&[action], &incident.camera_id, &ctx, self.clock.now());
        if approved.is_empty() {
            return;
        }
        if let Ok(outcome) = self
            .executor
            .execute(incident.clone(), approved, &self.camera.primary_contact, &self.camera.backup_contact)
            .await
        {
            *incident = outcome.incident;
            incident.escalation_stage += 1;
            self.emit(incident.id, EventKind::Escalation, incident);
            let _ = self.store.put_incident(incident);
        }
    }

    fn guard_context(&self, incident: &Incident) -> GuardContext {
        GuardContext {
            acked: incident.acknowledged,
            voice_enabled: self.camera.policy.voice_enabled,
            sms_enabled: self.camera.policy.sms_enabled,
            escalation_stage: incident.escalation_stage,
            cooldown_contact_s: self.camera.policy.cooldown_contact_s,
            max_primary_call_attempts: self.camera.policy.max_primary_call_attempts,
            max_escalation_stage: 2,
        }
    }

    fn emit(&self, incident_id: IncidentId, kind: EventKind, incident: &Incident) {
        let mut payload = serde_json::Map::new();
        payload.insert("severity_current".to_string(), serde_json::json!(incident.severity_current));
        payload.insert("plan_version".to_string(), serde_json::json!(incident.plan_version));
        payload.insert("escalation_stage".to_string(), serde_json::json!(incident.escalation_stage));
        let _ = self.timeline.log_event(incident_id, incident.camera_id.clone(), kind, payload);
    }
}

fn non_empty_frames(frames: &[Frame]) -> Vec<Frame> {
    if frames.is_empty() {
        vec![Frame { bytes: Vec::new() }]
    } else {
        frames.to_vec()
    }
}

fn policy_text(camera: &Camera) -> String {
    format!(
        "sms_enabled={} voice_enabled={} escalation_delay_s={} cooldown_contact_s={} max_primary_call_attempts={}",
        camera.policy.sms_enabled, camera.policy.voice_enabled, camera.policy.escalation_delay_s, camera.policy.cooldown_contact_s, camera.policy.max_primary_call_attempts
    )
}

/// Composes the caregiver-facing summary sentence (spec.md §4.5).
#[must_use]
pub fn summary(incident: &Incident) -> String {
    let verdict = match incident.verdict {
        Verdict::NoIncident => "No incident",
        Verdict::PossibleFall => "Possible fall",
        Verdict::ConfirmedFall => "Confirmed fall",
        Verdict::FalseAlarm => "False alarm",
    };
    let top_reasons: Vec<&str> = incident.reasons_current.iter().take(3).map(String::as_str).collect();
    let reasons = top_reasons.join("; ");
    let status = if incident.acknowledged { "acknowledged" } else { "not yet acknowledged" };
    format!(
        "{verdict} detected (severity {}/5). Time since event: {:.0}s. {reasons}. Escalation stage {}. Status: {status}.",
        incident.severity_current, incident.time_down_s, incident.escalation_stage
    )
}
