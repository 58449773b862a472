// crates/guardian-core/src/core/timeline.rs
// ============================================================================
// Module: Timeline Entities
// Description: Append-only incident timeline events, caregiver notes, and
// config-suggestion records.
// Purpose: Provide the durable audit trail fanned out by the Timeline
// Logger and persisted to the Datastore/Warehouse.
// Dependencies: crate::core::identifiers, crate::core::incident, serde, time
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::identifiers::AgentNoteId;
use crate::core::identifiers::CameraId;
use crate::core::identifiers::IncidentId;
use crate::core::identifiers::TimelineEventId;

// ============================================================================
// SECTION: Event Kind
// ============================================================================

/// The closed set of timeline event kinds (spec.md §3).
///
/// # Invariants
/// - This set is closed; adding a new kind requires a matching entry in
///   every consumer (store schema, warehouse sink), not a wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// A trigger (vision callback or telemetry) was received.
    TriggerReceived,
    /// A bed-relative posture assessment was produced.
    BedAssessment,
    /// A camera's prevention-path risk score was recomputed.
    RiskUpdated,
    /// A new plan was produced for an incident.
    PlanCreated,
    /// The safety guard finished approving a plan's actions.
    PlanApproved,
    /// The planner failed to produce a usable plan for this tick.
    PlanFailed,
    /// An approved action was dispatched and its outcome recorded.
    ActionExecuted,
    /// A periodic replan occurred.
    Replan,
    /// A periodic severity tick was recorded.
    SeverityTick,
    /// The incident escalated to the backup contact chain.
    Escalation,
    /// A caregiver acknowledged the incident.
    AckReceived,
    /// The incident reached a terminal status.
    Closed,
    /// A caregiver note was created.
    AgentNoteCreated,
    /// A config suggestion was applied during an idle window.
    ConfigSuggestionApplied,
    /// A summary or note was translated for a caregiver's language.
    Translated,
    /// A text-to-speech rendering was generated.
    TtsGenerated,
}

// ============================================================================
// SECTION: Timeline Event
// ============================================================================

/// One append-only timeline event.
///
/// # Invariants
/// - Never mutated or deleted once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Event identifier.
    pub id: TimelineEventId,
    /// Incident this event belongs to.
    pub incident_id: IncidentId,
    /// Camera the owning incident is on.
    pub camera_id: CameraId,
    /// The event's kind.
    pub kind: EventKind,
    /// When the event occurred.
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    /// Arbitrary kind-specific payload.
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// SECTION: Agent Note
// ============================================================================

/// Note priority, used to order active notes in planner context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotePriority {
    /// Informational context only.
    Low,
    /// Should be weighed alongside planner evidence.
    Normal,
    /// Should override default planner behavior where applicable.
    High,
}

/// A caregiver free-text note, either camera-scoped or global.
///
/// # Invariants
/// - `camera_id` is `None` for a global note.
/// - Active only while `expires_at > now` (see [`AgentNote::is_active`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNote {
    /// Note identifier.
    pub id: AgentNoteId,
    /// Camera this note applies to, or `None` for a global note.
    pub camera_id: Option<CameraId>,
    /// Free-text body as entered by the caregiver.
    pub body: String,
    /// Priority assigned to this note.
    pub priority: NotePriority,
    /// Keywords or phrases parsed out of `body` for planner context.
    pub watchlist: Vec<String>,
    /// Short summary of `body`, used in compact prompts.
    pub summary: String,
    /// When the note stops being active.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// When the note was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AgentNote {
    /// Returns true when `now` is before this note's expiry.
    #[must_use]
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}

// ============================================================================
// SECTION: Config Update
// ============================================================================

/// A record of one config-suggestion proposal and its disposition.
///
/// # Invariants
/// - `rolled_back` is only ever `true` when `applied` is `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// Camera the suggestion applies to.
    pub camera_id: CameraId,
    /// Rationale surfaced from the scheduler/warehouse suggestion.
    pub reason: String,
    /// Confidence in the suggestion, in `[0,1]`.
    pub confidence: f64,
    /// Raw suggested config patch, recognized-keys-only after filtering.
    pub config_json: serde_json::Map<String, serde_json::Value>,
    /// Whether the suggestion was applied.
    pub applied: bool,
    /// Whether a previously applied suggestion was rolled back.
    pub rolled_back: bool,
    /// When the suggestion was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use time::macros::datetime;

    use super::AgentNote;
    use super::AgentNoteId;
    use super::EventKind;
    use super::NotePriority;

    #[test]
    fn event_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&EventKind::TriggerReceived).expect("serialize event kind");
        assert_eq!(json, "\"TRIGGER_RECEIVED\"");
    }

    #[test]
    fn note_is_inactive_once_expired() {
        let note = AgentNote {
            id: AgentNoteId::generate(),
            camera_id: None,
            body: "watch for unsteady gait".to_string(),
            priority: NotePriority::Normal,
            watchlist: vec!["unsteady".to_string()],
            summary: "unsteady gait watch".to_string(),
            expires_at: datetime!(2026-01-01 00:00:00 UTC),
            created_at: datetime!(2025-12-31 00:00:00 UTC),
        };
        assert!(!note.is_active(datetime!(2026-01-02 00:00:00 UTC)));
        assert!(note.is_active(datetime!(2025-12-31 12:00:00 UTC)));
    }
}
