// crates/guardian-core/src/runtime/guard.rs
// ============================================================================
// Module: Safety Guard
// Description: Deterministic, stateful per-camera action admission filter.
// Purpose: Enforce cooldowns, capability gates, and escalation caps before
// any action reaches the executor.
// Dependencies: crate::core, std::sync
// ============================================================================

//! ## Overview
//! The guard owns no external side effects; it only decides which
//! proposed actions may be dispatched. State (`last_contact`,
//! `primary_call_count`) is process-wide, keyed by camera id, and
//! mutated under a single internal mutex so callers never need to
//! serialize access themselves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

use time::OffsetDateTime;

use crate::core::identifiers::CameraId;
use crate::core::incident::ActionType;
use crate::core::incident::PlanAction;

// ============================================================================
// SECTION: Guard Context
// ============================================================================

/// Per-call camera context the guard needs to decide admission.
///
/// # Invariants
/// - `cooldown_contact_s` and `max_primary_call_attempts` default to the
///   values in spec.md §4.2 (5 s, 2 attempts) when not overridden by a
///   camera's `NotificationPolicy`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardContext {
    /// Whether a caregiver has acknowledged the owning incident.
    pub acked: bool,
    /// Whether voice calls are enabled for this camera.
    pub voice_enabled: bool,
    /// Whether SMS is enabled for this camera.
    pub sms_enabled: bool,
    /// Current escalation stage, in `0..=2`.
    pub escalation_stage: u8,
    /// Minimum seconds between contact-class actions on this camera.
    pub cooldown_contact_s: f64,
    /// Maximum approved primary voice call attempts between resets.
    pub max_primary_call_attempts: u32,
    /// Maximum escalation stage (always 2 per spec.md §4.2).
    pub max_escalation_stage: u8,
}

impl Default for GuardContext {
    fn default() -> Self {
        Self {
            acked: false,
            voice_enabled: true,
            sms_enabled: true,
            escalation_stage: 0,
            cooldown_contact_s: 5.0,
            max_primary_call_attempts: 2,
            max_escalation_stage: 2,
        }
    }
}

// ============================================================================
// SECTION: Guard Decision
// ============================================================================

/// One admission decision for a proposed action.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardDecision {
    /// The action type this decision covers.
    pub action_type: ActionType,
    /// Whether the action was approved for dispatch.
    pub approved: bool,
    /// Human-readable reason, always present even when approved.
    pub reason: String,
}

// ============================================================================
// SECTION: Camera Guard State
// ============================================================================

#[derive(Debug, Clone, Default)]
struct CameraGuardState {
    last_contact: Option<OffsetDateTime>,
    primary_call_count: u32,
}

// ============================================================================
// SECTION: Safety Guard
// ============================================================================

/// Deterministic, stateful per-camera action admission filter
/// (spec.md §4.2).
#[derive(Debug, Default)]
pub struct SafetyGuard {
    state: Mutex<HashMap<CameraId, CameraGuardState>>,
}

impl SafetyGuard {
    /// Creates a guard with empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters `actions` in order, returning the approved subset and a
    /// full decision trace covering every proposed action.
    #[must_use]
    pub fn approve(
        &self,
        actions: &[PlanAction],
        camera_id: &CameraId,
        ctx: &GuardContext,
        now: OffsetDateTime,
    ) -> (Vec<PlanAction>, Vec<GuardDecision>) {
        let mut guard_state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let camera_state = guard_state.entry(camera_id.clone()).or_default();

        let mut approved_actions = Vec::new();
        let mut decisions = Vec::new();

        for proposed in actions {
            let decision = evaluate(proposed.action, camera_state, ctx, now);
            if decision.approved {
                apply_side_effects(proposed.action, camera_state, now);
                approved_actions.push(proposed.clone());
            }
            decisions.push(decision);
        }

        (approved_actions, decisions)
    }

    /// Clears guard state for a camera. Invoked on ACK, CLOSED, or
    /// FALSE_ALARM (spec.md §4.2).
    pub fn reset(&self, camera_id: &CameraId) {
        let mut guard_state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard_state.remove(camera_id);
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

fn evaluate(
    action: ActionType,
    camera_state: &CameraGuardState,
    ctx: &GuardContext,
    now: OffsetDateTime,
) -> GuardDecision {
    if action.always_approved() {
        return GuardDecision {
            action_type: action,
            approved: true,
            reason: "always approved".to_string(),
        };
    }

    if action.is_contact_class() {
        if let Some(last) = camera_state.last_contact {
            let elapsed = (now - last).as_seconds_f64();
            if elapsed < ctx.cooldown_contact_s {
                return GuardDecision {
                    action_type: action,
                    approved: false,
                    reason: format!(
                        "Contact cooldown active: {elapsed:.1}s elapsed, {:.1}s required",
                        ctx.cooldown_contact_s
                    ),
                };
            }
        }
    }

    match action {
        ActionType::StartVoiceCallPrimary => {
            if !ctx.voice_enabled {
                return denied(action, "Voice disabled for this camera");
            }
            if camera_state.primary_call_count >= ctx.max_primary_call_attempts {
                return denied(action, "Primary voice call attempt limit reached");
            }
        }
        ActionType::SendSmsPrimary => {
            if !ctx.sms_enabled {
                return denied(action, "SMS disabled for this camera");
            }
        }
        ActionType::EscalateToBackup => {
            if ctx.acked {
                return denied(action, "Incident already acknowledged");
            }
            if ctx.escalation_stage >= ctx.max_escalation_stage {
                return denied(action, "Escalation stage limit reached");
            }
        }
        _ => {}
    }

    GuardDecision {
        action_type: action,
        approved: true,
        reason: "approved".to_string(),
    }
}

fn denied(action: ActionType, reason: &str) -> GuardDecision {
    GuardDecision {
        action_type: action,
        approved: false,
        reason: reason.to_string(),
    }
}

fn apply_side_effects(action: ActionType, camera_state: &mut CameraGuardState, now: OffsetDateTime) {
    if action.is_contact_class() || action == ActionType::EscalateToBackup {
        camera_state.last_contact = Some(now);
    }
    if action == ActionType::StartVoiceCallPrimary {
        camera_state.primary_call_count += 1;
    }
}
