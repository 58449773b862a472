// crates/guardian-core/tests/guard_and_severity.rs
// ============================================================================
// Integration test: Safety Guard over a realistic fall scenario.
// ============================================================================

use guardian_core::core::identifiers::CameraId;
use guardian_core::core::incident::ActionType;
use guardian_core::core::incident::PlanAction;
use guardian_core::core::severity::severity;
use guardian_core::runtime::guard::GuardContext;
use guardian_core::runtime::guard::SafetyGuard;
use time::macros::datetime;

#[test]
fn fall_plan_is_approved_then_escalation_is_capped() {
    let guard = SafetyGuard::new();
    let camera_id = CameraId::new("cam-bedroom-1");
    let t0 = datetime!(2026-01-01 00:00:00 UTC);

    let initial_plan = vec![
        PlanAction::immediate(ActionType::SendSmsPrimary),
        PlanAction::delayed(ActionType::StartVoiceCallPrimary, 1.0),
    ];
    let ctx = GuardContext::default();
    let (approved, decisions) = guard.approve(&initial_plan, &camera_id, &ctx, t0);
    assert_eq!(approved.len(), 2);
    assert!(decisions.iter().all(|d| d.approved));

    let t1 = t0 + time::Duration::seconds(61);
    let escalate_ctx = GuardContext {
        escalation_stage: 0,
        ..GuardContext::default()
    };
    let (approved, _) = guard.approve(
        &[PlanAction::immediate(ActionType::EscalateToBackup)],
        &camera_id,
        &escalate_ctx,
        t1,
    );
    assert_eq!(approved.len(), 1);

    let t2 = t0 + time::Duration::seconds(121);
    let maxed_ctx = GuardContext {
        escalation_stage: 2,
        ..GuardContext::default()
    };
    let (approved, decisions) = guard.approve(
        &[PlanAction::immediate(ActionType::EscalateToBackup)],
        &camera_id,
        &maxed_ctx,
        t2,
    );
    assert!(approved.is_empty());
    assert!(decisions[0].reason.contains("limit reached"));
}

#[test]
fn severity_reaches_five_by_121_seconds_unacknowledged() {
    let value = severity(4, 121.0, 0.2, 0.1, false);
    assert_eq!(value, 5);
}

#[test]
fn acknowledgement_relieves_severity_by_one_notch() {
    let unacked = severity(4, 61.0, 0.2, 0.1, false);
    let acked = severity(4, 61.0, 0.2, 0.1, true);
    assert_eq!(acked, unacked - 1);
}
