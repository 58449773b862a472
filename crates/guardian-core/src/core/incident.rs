// crates/guardian-core/src/core/incident.rs
// ============================================================================
// Module: Incident Entities
// Description: Incidents, plans, and the closed set of plan action types.
// Purpose: Model the per-incident record produced by the trigger router
// and mutated by the incident controller.
// Dependencies: crate::core::identifiers, serde, time
// ============================================================================

//! ## Overview
//! An `Incident` is created once per fall/edge trigger (subject to
//! dedup, see `guardian-runtime::trigger`) and is mutated in place by
//! the incident controller until it reaches a terminal status.

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::identifiers::ActionLogId;
use crate::core::identifiers::CameraId;
use crate::core::identifiers::IncidentId;
use crate::core::identifiers::PlanId;

/// Maximum number of base64-encoded frames retained on an incident.
pub const MAX_RETAINED_FRAMES: usize = 4;

// ============================================================================
// SECTION: Trigger Kind
// ============================================================================

/// What caused an incident to be opened or attached to.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    /// Vision pipeline reported a confirmed fall classification.
    Fall,
    /// Vision pipeline reported an edge-of-bed or similar precursor event.
    Edge,
    /// Explicit `FALL_TRIGGER` telemetry, distinct from a vision callback.
    FallTrigger,
}

/// Seed values applied to a newly created [`Incident`], keyed by the
/// [`TriggerKind`] that created it (spec.md §4.6's seed table).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerSeed {
    /// Initial verdict.
    pub verdict: Verdict,
    /// Initial severity seed, in `1..=5`.
    pub severity_seed: u8,
    /// Initial risk score, in `[0,1]`.
    pub risk_score: f64,
    /// Initial confidence, in `[0,1]`, when not planner-assigned.
    pub confidence: Option<f64>,
}

impl TriggerKind {
    /// Returns the incident seed values for this trigger kind.
    #[must_use]
    pub const fn seed(self) -> TriggerSeed {
        match self {
            Self::Fall => TriggerSeed {
                verdict: Verdict::ConfirmedFall,
                severity_seed: 4,
                risk_score: 0.9,
                confidence: Some(0.8),
            },
            Self::Edge => TriggerSeed {
                verdict: Verdict::PossibleFall,
                severity_seed: 3,
                risk_score: 0.6,
                confidence: Some(0.65),
            },
            Self::FallTrigger => TriggerSeed {
                verdict: Verdict::PossibleFall,
                severity_seed: 3,
                risk_score: 0.8,
                confidence: None,
            },
        }
    }
}

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Planner-assessed verdict for the current incident state.
///
/// # Invariants
/// - Unknown wire values must be rejected at the parsing boundary
///   (`guardian-planner`), never coerced to a default variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// No incident is occurring.
    NoIncident,
    /// A fall may have occurred; further verification is warranted.
    PossibleFall,
    /// A fall has been confirmed.
    ConfirmedFall,
    /// A previously opened incident is judged a false alarm.
    FalseAlarm,
}

// ============================================================================
// SECTION: Incident Status
// ============================================================================

/// Incident lifecycle status.
///
/// # Invariants
/// - Transitions only ever move forward: `Active` -> `Acked` -> `Closed`,
///   or `Active` -> `Closed` directly (false alarm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    /// Incident is open and the controller task is running.
    Active,
    /// A caregiver has acknowledged the incident.
    Acked,
    /// Incident has reached a terminal state.
    Closed,
}

// ============================================================================
// SECTION: Action Type
// ============================================================================

/// The closed set of actions a plan may request.
///
/// # Invariants
/// - This set is closed; the planner adapter rejects any action name
///   outside it rather than passing it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Raise the re-plan check rate for this incident.
    IncreaseCheckRate,
    /// Send a low-priority heads-up SMS to the primary contact.
    SendLowPriorityHeadsup,
    /// Send an SMS to the primary contact.
    SendSmsPrimary,
    /// Start a voice call to the primary contact.
    StartVoiceCallPrimary,
    /// Escalate the incident to the backup contact chain.
    EscalateToBackup,
    /// Cancel a previously proposed escalation.
    CancelEscalation,
    /// Close the incident.
    CloseIncident,
    /// Request one additional high-resolution verification pass.
    RequestStrongVerify,
}

impl ActionType {
    /// Returns true for the always-approved action types (spec.md §4.2).
    #[must_use]
    pub const fn always_approved(self) -> bool {
        matches!(self, Self::CloseIncident | Self::CancelEscalation)
    }

    /// Returns true for contact-class actions subject to the cooldown
    /// rule (spec.md §4.2).
    #[must_use]
    pub const fn is_contact_class(self) -> bool {
        matches!(
            self,
            Self::SendSmsPrimary | Self::StartVoiceCallPrimary | Self::SendLowPriorityHeadsup
        )
    }
}

// ============================================================================
// SECTION: Plan Action
// ============================================================================

/// One action requested by an `IncidentPlan`.
///
/// # Invariants
/// - `action` is always a member of the closed [`ActionType`] set.
/// - `delay_s` is always `>= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAction {
    /// The requested action.
    #[serde(rename = "type")]
    pub action: ActionType,
    /// Seconds to wait before dispatching this action.
    pub delay_s: f64,
    /// Arbitrary per-action parameters (e.g. `interval_s` for
    /// `INCREASE_CHECK_RATE`).
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl PlanAction {
    /// Creates a plan action with no delay and no parameters.
    #[must_use]
    pub fn immediate(action: ActionType) -> Self {
        Self {
            action,
            delay_s: 0.0,
            params: serde_json::Map::new(),
        }
    }

    /// Creates a plan action with the given delay and no parameters.
    #[must_use]
    pub fn delayed(action: ActionType, delay_s: f64) -> Self {
        Self {
            action,
            delay_s: delay_s.max(0.0),
            params: serde_json::Map::new(),
        }
    }
}

// ============================================================================
// SECTION: Model Used
// ============================================================================

/// Which planner mode produced an [`IncidentPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelUsed {
    /// Fast, low-latency assessment model.
    Fast,
    /// Slower, higher-fidelity strong-verify model.
    Strong,
    /// Full video upload assessment.
    VideoUpload,
}

// ============================================================================
// SECTION: Incident Plan
// ============================================================================

/// An immutable, versioned plan produced by one planner invocation.
///
/// # Invariants
/// - `version` starts at 1 and increases by exactly 1 per incident, per
///   replan cycle.
/// - `replan_interval_s >= 1.0`.
/// - Once persisted, a plan's fields never change; a replan always
///   produces a new `IncidentPlan` with an incremented version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentPlan {
    /// Plan identifier.
    pub id: PlanId,
    /// Owning incident.
    pub incident_id: IncidentId,
    /// Monotonically increasing version, starting at 1.
    pub version: u32,
    /// Which planner mode produced this plan.
    pub model_used: ModelUsed,
    /// Planner-assessed verdict that produced this plan.
    pub verdict: Verdict,
    /// Severity seed carried by this plan, in `1..=5`.
    pub severity_seed: u8,
    /// Planner confidence in `[0,1]`.
    pub confidence: f64,
    /// Free-text reasons surfaced to caregivers.
    pub reasons: Vec<String>,
    /// Ordered actions requested by this plan.
    pub actions: Vec<PlanAction>,
    /// Seconds until the next replan should occur; always `>= 1.0`.
    pub replan_interval_s: f64,
    /// When this plan was produced.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Returns whether a plan needs a strong-verify follow-up, per spec.md
/// §4.3: `(verdict = POSSIBLE_FALL ∧ confidence < 0.6)` or
/// `(severity_seed ≥ 4 ∧ confidence < 0.7)`.
#[must_use]
pub fn needs_strong_verify(verdict: Verdict, severity_seed: u8, confidence: f64) -> bool {
    (verdict == Verdict::PossibleFall && confidence < 0.6) || (severity_seed >= 4 && confidence < 0.7)
}

// ============================================================================
// SECTION: Action Log
// ============================================================================

/// Outcome of one executed [`PlanAction`].
///
/// # Invariants
/// - One `ActionLog` is recorded per dispatched action, including
///   failures; the executor never silently drops a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    /// Log record identifier.
    pub id: ActionLogId,
    /// Owning incident.
    pub incident_id: IncidentId,
    /// Camera the owning incident is on.
    pub camera_id: CameraId,
    /// The action that was attempted.
    pub action_type: ActionType,
    /// Parameters the action was dispatched with.
    pub params: serde_json::Map<String, serde_json::Value>,
    /// External id on success, or an error string on failure.
    pub result: String,
    /// When the action was attempted.
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

// ============================================================================
// SECTION: Incident
// ============================================================================

/// An active or historical fall/edge incident on one camera.
///
/// # Invariants
/// - `camera_id` never changes after creation.
/// - `status` only ever moves forward (see [`IncidentStatus`]).
/// - `severity_current` and `severity_seed` are always in `1..=5`.
/// - `escalation_stage` is always in `0..=2` and monotonic non-decreasing.
/// - `frames_b64.len() <= MAX_RETAINED_FRAMES`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Incident identifier.
    pub id: IncidentId,
    /// Camera this incident was opened on.
    pub camera_id: CameraId,
    /// When the incident was opened.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Current lifecycle status.
    pub status: IncidentStatus,
    /// Most recent verdict observed for this incident.
    pub verdict: Verdict,
    /// Severity assigned at creation, in `1..=5`.
    pub severity_seed: u8,
    /// Current severity, recomputed by the severity ticker, in `1..=5`.
    pub severity_current: u8,
    /// Current risk score, in `[0,1]`.
    pub risk_score: f64,
    /// Current planner confidence, in `[0,1]`.
    pub confidence: f64,
    /// Seconds since the subject was first observed down.
    pub time_down_s: f64,
    /// Whether a caregiver has acknowledged the incident.
    pub acknowledged: bool,
    /// Who acknowledged the incident, if anyone.
    pub ack_by: Option<String>,
    /// Escalation stage, in `0..=2`.
    pub escalation_stage: u8,
    /// Current plan version, `>= 0` (0 before the first plan).
    pub plan_version: u32,
    /// Top reasons from the most recent plan.
    pub reasons_current: Vec<String>,
    /// Caregiver-facing language code (e.g. `"en"`).
    pub language: String,
    /// Rendered summary text, refreshed on every severity tick.
    pub summary_text: String,
    /// Retained base64 JPEG frames, oldest first, capped at
    /// [`MAX_RETAINED_FRAMES`].
    pub frames_b64: Vec<String>,
}

impl Incident {
    /// Returns true when the incident is still driving a controller task.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.status, IncidentStatus::Active)
    }

    /// Appends a frame, evicting the oldest when at capacity.
    pub fn push_frame(&mut self, frame_b64: String) {
        if self.frames_b64.len() >= MAX_RETAINED_FRAMES {
            self.frames_b64.remove(0);
        }
        self.frames_b64.push(frame_b64);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use super::needs_strong_verify;
    use super::ActionType;
    use super::Verdict;

    #[test]
    fn verdict_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&Verdict::ConfirmedFall).expect("serialize verdict");
        assert_eq!(json, "\"CONFIRMED_FALL\"");
    }

    #[test]
    fn unknown_action_type_is_rejected() {
        let result: Result<ActionType, _> = serde_json::from_str("\"DELETE_EVERYTHING\"");
        assert!(result.is_err());
    }

    #[test]
    fn strong_verify_triggers_on_low_confidence_possible_fall() {
        assert!(needs_strong_verify(Verdict::PossibleFall, 3, 0.5));
        assert!(!needs_strong_verify(Verdict::PossibleFall, 3, 0.9));
    }

    #[test]
    fn strong_verify_triggers_on_high_severity_low_confidence() {
        assert!(needs_strong_verify(Verdict::ConfirmedFall, 4, 0.6));
        assert!(!needs_strong_verify(Verdict::ConfirmedFall, 4, 0.8));
    }
}
