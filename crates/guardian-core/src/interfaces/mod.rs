// crates/guardian-core/src/interfaces/mod.rs
// ============================================================================
// Module: Guardian Interfaces
// Description: Backend-agnostic interfaces for planning, notification,
// persistence, and analytics.
// Purpose: Define the contract surfaces the runtime integrates against
// without embedding backend-specific details.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the incident controller integrates with the
//! vision pipeline, the planner, the notification gateway, the
//! datastore, and the analytics warehouse without embedding
//! backend-specific details. Implementations must fail closed on
//! missing or invalid data; none of these traits are async, so callers
//! running inside `tokio` wrap blocking implementations in
//! `tokio::task::spawn_blocking`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::camera::BedPolygon;
use crate::core::camera::Camera;
use crate::core::camera::RoomType;
use crate::core::identifiers::CameraId;
use crate::core::identifiers::IncidentId;
use crate::core::incident::ActionLog;
use crate::core::incident::ActionType;
use crate::core::incident::Incident;
use crate::core::incident::IncidentPlan;
use crate::core::incident::PlanAction;
use crate::core::incident::TriggerKind;
use crate::core::incident::Verdict;
use crate::core::severity::BedState;
use crate::core::severity::Stability;
use crate::core::timeline::AgentNote;
use crate::core::timeline::ConfigUpdate;
use crate::core::timeline::TimelineEvent;

// ============================================================================
// SECTION: Shared Planner Types
// ============================================================================

/// One frame submitted for planner assessment, as a JPEG byte buffer.
///
/// # Invariants
/// - `bytes` is a complete, independently decodable JPEG image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// JPEG-encoded frame bytes.
    pub bytes: Vec<u8>,
}

/// Which mode a `plan_incident` call runs in: driving an open incident,
/// or proposing prevention-path actions on an idle camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlannerMode {
    /// Call is driving an open `Incident`.
    Incident,
    /// Call is a prevention-path assessment on a camera with no active incident.
    Prevention,
}

/// A compact snapshot of incident state relayed to the planner so it can
/// reason about what changed since the last plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentStateSnapshot {
    /// Current verdict.
    pub verdict: Verdict,
    /// Current severity, in `1..=5`.
    pub severity_current: u8,
    /// Current escalation stage, in `0..=2`.
    pub escalation_stage: u8,
    /// Seconds since the subject was first observed down.
    pub time_down_s: f64,
    /// Whether a caregiver has acknowledged the incident.
    pub acknowledged: bool,
}

/// A draft plan returned by the planner, before an id/version/timestamp
/// are assigned (see `guardian-planner::assign_plan_metadata`).
///
/// # Invariants
/// - `confidence` is in `[0,1]`.
/// - `severity_seed` is in `1..=5`.
/// - `replan_interval_s >= 1.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerPlanDraft {
    /// Assessed verdict.
    pub verdict: Verdict,
    /// Severity seed carried by this draft, in `1..=5`.
    pub severity_seed: u8,
    /// Confidence in `[0,1]`.
    pub confidence: f64,
    /// Free-text reasons.
    pub reasons: Vec<String>,
    /// Requested actions.
    pub actions: Vec<PlanAction>,
    /// Seconds until the next replan should occur; always `>= 1.0`.
    pub replan_interval_s: f64,
}

/// Request for [`Planner::plan_incident`].
///
/// # Invariants
/// - `frames` is never empty and never exceeds 4 entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanIncidentRequest {
    /// Incident this request concerns, when driving an open incident.
    pub incident_id: Option<IncidentId>,
    /// Camera this request concerns.
    pub camera_id: CameraId,
    /// Frames to assess, oldest first, at most 4.
    pub frames: Vec<Frame>,
    /// Motion energy in `[0,1]`.
    pub motion: f64,
    /// Stillness in `[0,1]`.
    pub stillness: f64,
    /// Room classification for prompt context.
    pub room_type: RoomType,
    /// Rendered notification-policy summary for prompt context.
    pub policy_text: String,
    /// Current incident state, when driving an open incident.
    pub incident_state: Option<IncidentStateSnapshot>,
    /// Active caregiver notes for this camera or global scope.
    pub agent_notes: Vec<AgentNote>,
    /// Incident vs. prevention mode.
    pub mode: PlannerMode,
}

/// Request for [`Planner::plan_strong`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStrongRequest {
    /// Frames to assess, at most 4.
    pub frames: Vec<Frame>,
    /// Motion energy in `[0,1]`.
    pub motion: f64,
    /// Stillness in `[0,1]`.
    pub stillness: f64,
    /// The plan being verified.
    pub current_plan: IncidentPlan,
    /// Current incident state.
    pub incident_state: IncidentStateSnapshot,
}

/// Result of [`Planner::assess_bed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BedAssessment {
    /// Assessed bed-relative posture.
    pub bed_state: BedState,
    /// Assessed posture stability.
    pub stability: Stability,
}

/// Request for [`Planner::assess_bed`].
#[derive(Debug, Clone, PartialEq)]
pub struct BedAssessmentRequest {
    /// Frames to assess, at most 4.
    pub frames: Vec<Frame>,
    /// Camera's bed polygon, when registered.
    pub bed_polygon: Option<BedPolygon>,
    /// Room classification for prompt context.
    pub room_type: RoomType,
}

/// Planner errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Error)]
pub enum PlannerError {
    /// The planner endpoint could not be reached or timed out.
    #[error("planner unreachable: {0}")]
    Unreachable(String),
    /// The planner response could not be parsed or failed schema validation.
    #[error("planner response invalid: {0}")]
    InvalidResponse(String),
}

/// Backend-agnostic assessment planner (vision-language model client).
///
/// The three methods mirror spec.md §4.3's three RPC-shaped calls.
pub trait Planner {
    /// Requests a full incident plan for the given frames and context.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError`] when the planner cannot be reached or its
    /// response is invalid after the adapter's retry (see
    /// `guardian-planner::adapter`).
    fn plan_incident(&self, request: &PlanIncidentRequest) -> Result<PlannerPlanDraft, PlannerError>;

    /// Requests a strong-verify re-assessment of an existing plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError`] when the planner cannot be reached or its
    /// response is invalid.
    fn plan_strong(&self, request: &PlanStrongRequest) -> Result<PlannerPlanDraft, PlannerError>;

    /// Requests a bed-relative posture assessment.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError`] when the planner cannot be reached or its
    /// response is invalid.
    fn assess_bed(&self, request: &BedAssessmentRequest) -> Result<BedAssessment, PlannerError>;
}

// ============================================================================
// SECTION: Notification Gateway
// ============================================================================

/// Gateway errors for notification delivery.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway reported a delivery failure.
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
    /// The requested channel is disabled for this camera's policy.
    #[error("channel disabled: {0}")]
    ChannelDisabled(String),
}

/// Notification gateway responsible for SMS and voice dispatch.
///
/// Each method returns the gateway's external id on success, for
/// recording on the corresponding `ActionLog` (spec.md §4.4).
pub trait NotificationGateway {
    /// Sends an SMS to the given contact.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when delivery fails.
    fn send_sms(&self, to: &str, body: &str) -> Result<String, GatewayError>;

    /// Starts a voice call to the given contact for the given incident,
    /// whose call-control document is fetched by the gateway at a URL
    /// parameterized by `incident_id` (spec.md §6).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the call cannot be started.
    fn start_voice_call(&self, to: &str, incident_id: &IncidentId) -> Result<String, GatewayError>;
}

// ============================================================================
// SECTION: Datastore
// ============================================================================

/// Datastore errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("datastore io error: {0}")]
    Io(String),
    /// Requested record does not exist.
    #[error("datastore record not found: {0}")]
    NotFound(String),
    /// Store reported an error outside the above categories.
    #[error("datastore error: {0}")]
    Store(String),
}

/// Durable persistence for cameras, incidents, plans, and timeline records.
///
/// Covers the entities and queries listed in spec.md §6: Camera,
/// NotificationPolicy (embedded on `Camera`), Incident, IncidentPlan,
/// IncidentTimeline, ActionLog, AgentNote, ConfigUpdate.
pub trait Datastore {
    /// Loads a camera by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn get_camera(&self, id: &CameraId) -> Result<Option<Camera>, StoreError>;

    /// Inserts or replaces a camera record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn put_camera(&self, camera: &Camera) -> Result<(), StoreError>;

    /// Returns the active incident on a camera, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn active_incident_for_camera(&self, camera_id: &CameraId) -> Result<Option<Incident>, StoreError>;

    /// Inserts or replaces an incident record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn put_incident(&self, incident: &Incident) -> Result<(), StoreError>;

    /// Returns the highest-version plan recorded for an incident, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn latest_plan(&self, incident_id: &IncidentId) -> Result<Option<IncidentPlan>, StoreError>;

    /// Appends a new plan version for an incident.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn put_plan(&self, plan: &IncidentPlan) -> Result<(), StoreError>;

    /// Appends an action log record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn put_action_log(&self, log: &ActionLog) -> Result<(), StoreError>;

    /// Appends a timeline event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn append_timeline_event(&self, event: &TimelineEvent) -> Result<(), StoreError>;

    /// Returns active agent notes scoped to `camera_id`, or global notes
    /// when `camera_id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn active_notes_for(&self, camera_id: Option<&CameraId>) -> Result<Vec<AgentNote>, StoreError>;

    /// Inserts or replaces a caregiver note.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn put_agent_note(&self, note: &AgentNote) -> Result<(), StoreError>;

    /// Records a config-suggestion disposition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn put_config_update(&self, update: &ConfigUpdate) -> Result<(), StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Warehouse
// ============================================================================

/// Warehouse errors for analytics sink delivery.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The warehouse sink reported a delivery failure.
    #[error("warehouse delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Best-effort analytics sink for timeline events, matching spec.md §6's
/// "best-effort `write_*` methods"; failure never affects live behavior.
pub trait Warehouse {
    /// Flushes a batch of timeline events to the warehouse.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError`] when the batch cannot be delivered; the
    /// caller is expected to drop the batch rather than retry
    /// indefinitely (see `guardian-runtime`'s bounded flush buffer).
    fn flush(&self, events: &[TimelineEvent]) -> Result<(), WarehouseError>;

    /// Reads pending config-optimization suggestions for idle-window
    /// application (spec.md §4.7's `config_optimization` task).
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError`] when suggestions cannot be read.
    fn read_config_suggestions(&self) -> Result<Vec<ConfigUpdate>, WarehouseError>;
}

// ============================================================================
// SECTION: Vision Trigger
// ============================================================================

/// One observation pushed by the vision pipeline or telemetry ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionObservation {
    /// Camera the observation is from.
    pub camera_id: CameraId,
    /// Motion energy in `[0,1]`.
    pub motion: f64,
    /// Stillness in `[0,1]`.
    pub stillness: f64,
    /// Frame bytes accompanying this observation, if any.
    pub frame: Option<Frame>,
    /// Set when this observation is itself a fall/edge/explicit trigger.
    pub trigger: Option<TriggerKind>,
}

/// Vision pipeline / telemetry trigger source for push-mode ingestion.
pub trait VisionTrigger {
    /// Returns the next available observation, if any.
    fn next_observation(&mut self) -> Option<VisionObservation>;
}

// ============================================================================
// SECTION: Guardian Metrics
// ============================================================================

/// Counters and histograms the runtime reports, with no hard dependency
/// on a metrics backend.
pub trait GuardianMetrics: Send + Sync {
    /// Records one planner call and its latency in milliseconds.
    fn record_planner_call(&self, succeeded: bool, latency_ms: u64);

    /// Records one notification dispatch and its outcome.
    fn record_dispatch(&self, action: ActionType, succeeded: bool);

    /// Records one warehouse flush batch size.
    fn record_warehouse_flush(&self, batch_size: usize, succeeded: bool);
}

/// A [`GuardianMetrics`] implementation that discards every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl GuardianMetrics for NoopMetrics {
    fn record_planner_call(&self, _succeeded: bool, _latency_ms: u64) {}

    fn record_dispatch(&self, _action: ActionType, _succeeded: bool) {}

    fn record_warehouse_flush(&self, _batch_size: usize, _succeeded: bool) {}
}
