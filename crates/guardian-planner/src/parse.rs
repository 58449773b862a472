// crates/guardian-planner/src/parse.rs
// ============================================================================
// Module: Planner Response Parsing
// Description: Fenced-JSON stripping and strict schema validation for
// planner responses.
// Purpose: Turn raw VLM text into a `PlannerPlanDraft`/`BedAssessment`,
// rejecting anything that does not match the closed schema.
// Dependencies: guardian-core, serde_json
// ============================================================================

//! ## Overview
//! Planner responses arrive as free-form text that may wrap a JSON
//! object in a Markdown code fence. This module strips that fence, then
//! deserializes against the closed `Verdict`/`ActionType` schemas:
//! unknown enum values are rejected outright (spec.md §9), never
//! coerced to a default.

use guardian_core::core::incident::PlanAction;
use guardian_core::core::incident::Verdict;
use guardian_core::core::severity::BedState;
use guardian_core::core::severity::Stability;
use guardian_core::interfaces::BedAssessment;
use guardian_core::interfaces::PlannerError;
use guardian_core::interfaces::PlannerPlanDraft;
use serde::Deserialize;

// ============================================================================
// SECTION: Fence Stripping
// ============================================================================

/// Strips a leading/trailing Markdown code fence (```` ``` ```` or
/// ```` ```json ````) from planner output, if present.
#[must_use]
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_open = after_open.strip_prefix("json").unwrap_or(after_open);
    let after_open = after_open.trim_start_matches(['\r', '\n']);
    after_open.strip_suffix("```").map_or(after_open, str::trim_end)
}

// ============================================================================
// SECTION: Wire Schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct PlanResponseWire {
    verdict: Verdict,
    severity_seed: u8,
    confidence: f64,
    #[serde(default)]
    reasons: Vec<String>,
    actions: Vec<PlanAction>,
    replan_interval_s: f64,
}

#[derive(Debug, Deserialize)]
struct BedAssessmentWire {
    bed_state: BedState,
    stability: Stability,
}

// ============================================================================
// SECTION: Plan Parsing
// ============================================================================

/// Parses a strict plan response, stripping any fence first.
///
/// # Errors
///
/// Returns [`PlannerError::InvalidResponse`] when the text is not valid
/// JSON, uses an unrecognized `Verdict`/`ActionType` variant, or any
/// numeric field is outside its documented range.
pub fn parse_plan_response(raw: &str) -> Result<PlannerPlanDraft, PlannerError> {
    let stripped = strip_fences(raw);
    let wire: PlanResponseWire =
        serde_json::from_str(stripped).map_err(|err| PlannerError::InvalidResponse(err.to_string()))?;

    if !(1..=5).contains(&wire.severity_seed) {
        return Err(PlannerError::InvalidResponse(format!(
            "severity_seed out of range: {}",
            wire.severity_seed
        )));
    }
    if !(0.0..=1.0).contains(&wire.confidence) {
        return Err(PlannerError::InvalidResponse(format!("confidence out of range: {}", wire.confidence)));
    }
    if wire.replan_interval_s < 1.0 {
        return Err(PlannerError::InvalidResponse(format!(
            "replan_interval_s below minimum: {}",
            wire.replan_interval_s
        )));
    }
    for action in &wire.actions {
        if action.delay_s < 0.0 {
            return Err(PlannerError::InvalidResponse(format!("negative delay_s: {}", action.delay_s)));
        }
    }

    Ok(PlannerPlanDraft {
        verdict: wire.verdict,
        severity_seed: wire.severity_seed,
        confidence: wire.confidence,
        reasons: wire.reasons,
        actions: wire.actions,
        replan_interval_s: wire.replan_interval_s,
    })
}

/// Parses a strict bed-assessment response, stripping any fence first.
///
/// # Errors
///
/// Returns [`PlannerError::InvalidResponse`] when the text is not valid
/// JSON or uses an unrecognized `BedState`/`Stability` variant.
pub fn parse_bed_assessment(raw: &str) -> Result<BedAssessment, PlannerError> {
    let stripped = strip_fences(raw);
    let wire: BedAssessmentWire =
        serde_json::from_str(stripped).map_err(|err| PlannerError::InvalidResponse(err.to_string()))?;
    Ok(BedAssessment {
        bed_state: wire.bed_state,
        stability: wire.stability,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use super::parse_plan_response;
    use super::strip_fences;
    use guardian_core::core::incident::Verdict;

    #[test]
    fn strip_fences_removes_json_fence() {
        let raw = "```json\n{\"a\":1}\n```";
        assert_eq!(strip_fences(raw), "{\"a\":1}");
    }

    #[test]
    fn strip_fences_passes_through_bare_json() {
        let raw = "{\"a\":1}";
        assert_eq!(strip_fences(raw), "{\"a\":1}");
    }

    #[test]
    fn parse_plan_response_rejects_unknown_verdict() {
        let raw = r#"{"verdict":"MAYBE","severity_seed":3,"confidence":0.5,"actions":[],"replan_interval_s":5.0}"#;
        assert!(parse_plan_response(raw).is_err());
    }

    #[test]
    fn parse_plan_response_rejects_out_of_range_severity() {
        let raw = r#"{"verdict":"POSSIBLE_FALL","severity_seed":9,"confidence":0.5,"actions":[],"replan_interval_s":5.0}"#;
        assert!(parse_plan_response(raw).is_err());
    }

    #[test]
    fn parse_plan_response_accepts_fenced_valid_json() {
        let raw = "```json\n{\"verdict\":\"POSSIBLE_FALL\",\"severity_seed\":3,\"confidence\":0.7,\"reasons\":[\"r\"],\"actions\":[],\"replan_interval_s\":5.0}\n```";
        let draft = parse_plan_response(raw).expect("valid plan");
        assert_eq!(draft.verdict, Verdict::PossibleFall);
    }
}
