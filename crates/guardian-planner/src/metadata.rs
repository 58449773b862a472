// crates/guardian-planner/src/metadata.rs
// ============================================================================
// Module: Plan Metadata Assignment
// Description: Turns a bare `PlannerPlanDraft` into a persisted, versioned
// `IncidentPlan`.
// Purpose: Centralize the one place a plan's id/version/timestamp are
// assigned, so every caller (initial plan, replan, strong-verify) does it
// identically.
// Dependencies: guardian-core
// ============================================================================

use time::OffsetDateTime;

use guardian_core::core::identifiers::IncidentId;
use guardian_core::core::identifiers::PlanId;
use guardian_core::core::incident::IncidentPlan;
use guardian_core::core::incident::ModelUsed;
use guardian_core::interfaces::PlannerPlanDraft;

/// Assigns a fresh id, `version`, and `created_at` to a planner draft,
/// producing the immutable [`IncidentPlan`] that gets persisted.
#[must_use]
pub fn assign_plan_metadata(
    draft: PlannerPlanDraft,
    incident_id: IncidentId,
    version: u32,
    model_used: ModelUsed,
    created_at: OffsetDateTime,
) -> IncidentPlan {
    IncidentPlan {
        id: PlanId::generate(),
        incident_id,
        version,
        model_used,
        verdict: draft.verdict,
        severity_seed: draft.severity_seed,
        confidence: draft.confidence,
        reasons: draft.reasons,
        actions: draft.actions,
        replan_interval_s: draft.replan_interval_s.max(1.0),
        created_at,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use time::macros::datetime;

    use super::assign_plan_metadata;
    use guardian_core::core::identifiers::IncidentId;
    use guardian_core::core::incident::ModelUsed;
    use guardian_core::core::incident::Verdict;
    use guardian_core::interfaces::PlannerPlanDraft;

    #[test]
    fn replan_interval_is_floored_at_one_second() {
        let draft = PlannerPlanDraft {
            verdict: Verdict::PossibleFall,
            severity_seed: 3,
            confidence: 0.5,
            reasons: vec![],
            actions: vec![],
            replan_interval_s: 0.1,
        };
        let plan = assign_plan_metadata(draft, IncidentId::generate(), 1, ModelUsed::Fast, datetime!(2026-01-01 00:00:00 UTC));
        assert_eq!(plan.version, 1);
        assert!((plan.replan_interval_s - 1.0).abs() < f64::EPSILON);
    }
}
