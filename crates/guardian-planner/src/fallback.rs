// crates/guardian-planner/src/fallback.rs
// ============================================================================
// Module: Fallback Plan
// Description: The deterministic plan substituted whenever the planner is
// unreachable or returns an invalid response.
// Purpose: Guarantee a safe minimum response (an SMS, and a voice call for
// high-motion events) even with zero external dependencies available.
// Dependencies: guardian-core
// ============================================================================

//! ## Overview
//! The fallback plan never calls out to anything. It exists so a
//! camera, gateway, or LLM outage never leaves a fall silently
//! unreported: the primary contact always gets an SMS, and a voice call
//! follows when motion suggests urgency and voice is enabled.

use guardian_core::core::incident::ActionType;
use guardian_core::core::incident::PlanAction;
use guardian_core::core::incident::Verdict;
use guardian_core::interfaces::PlannerPlanDraft;

/// Builds the deterministic fallback plan for a given motion reading and
/// whether the camera's policy allows voice calls.
#[must_use]
pub fn fallback_plan(motion: f64, voice_enabled: bool) -> PlannerPlanDraft {
    let severity_seed = if motion > 0.8 { 4 } else { 3 };
    let mut actions = vec![PlanAction::immediate(ActionType::SendSmsPrimary)];
    if voice_enabled && severity_seed >= 4 {
        actions.push(PlanAction::delayed(ActionType::StartVoiceCallPrimary, 1.0));
    }

    PlannerPlanDraft {
        verdict: Verdict::PossibleFall,
        severity_seed,
        confidence: 0.3,
        reasons: vec!["Fallback plan: planner unavailable or invalid".to_string()],
        actions,
        replan_interval_s: 5.0,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use super::fallback_plan;
    use guardian_core::core::incident::ActionType;

    #[test]
    fn low_motion_omits_voice_call() {
        let plan = fallback_plan(0.2, true);
        assert_eq!(plan.severity_seed, 3);
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].action, ActionType::SendSmsPrimary);
    }

    #[test]
    fn high_motion_with_voice_enabled_adds_call() {
        let plan = fallback_plan(0.9, true);
        assert_eq!(plan.severity_seed, 4);
        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.actions[1].action, ActionType::StartVoiceCallPrimary);
    }

    #[test]
    fn high_motion_with_voice_disabled_omits_call() {
        let plan = fallback_plan(0.95, false);
        assert_eq!(plan.actions.len(), 1);
    }
}
