// crates/guardian-planner/tests/parse_and_fallback.rs
// ============================================================================
// Integration test: parsing a realistic VLM response and the fallback path.
// ============================================================================

use guardian_core::core::incident::ActionType;
use guardian_core::core::incident::Verdict;
use guardian_planner::fallback::fallback_plan;
use guardian_planner::parse::parse_plan_response;

#[test]
fn parses_a_realistic_fenced_incident_response() {
    let raw = r#"Here is my assessment:
```json
{
  "verdict": "CONFIRMED_FALL",
  "severity_seed": 4,
  "confidence": 0.9,
  "reasons": ["subject prone on floor", "no movement for 15s"],
  "actions": [
    {"type": "SEND_SMS_PRIMARY", "delay_s": 0, "params": {}},
    {"type": "START_VOICE_CALL_PRIMARY", "delay_s": 1.0, "params": {}}
  ],
  "replan_interval_s": 10.0
}
```"#;
    let draft = parse_plan_response(raw).expect("valid fenced response");
    assert_eq!(draft.verdict, Verdict::ConfirmedFall);
    assert_eq!(draft.actions.len(), 2);
    assert_eq!(draft.actions[1].action, ActionType::StartVoiceCallPrimary);
}

#[test]
fn malformed_response_is_rejected_and_fallback_is_used_instead() {
    let raw = "not json at all";
    assert!(parse_plan_response(raw).is_err());

    let fallback = fallback_plan(0.85, true);
    assert_eq!(fallback.verdict, Verdict::PossibleFall);
    assert_eq!(fallback.severity_seed, 4);
    assert_eq!(fallback.actions.len(), 2);
}
