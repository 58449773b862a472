// crates/guardian-planner/src/fake.rs
// ============================================================================
// Module: Test Doubles
// Description: In-memory `Planner` implementations for unit and
// integration tests.
// Purpose: Exercise adapter retry/fallback logic and downstream runtime
// code without a network dependency.
// Dependencies: guardian-core
// ============================================================================

//! ## Overview
//! `FakePlanner` always returns one fixed draft. `ScriptedPlanner`
//! replays a queue of canned responses (including errors), one per
//! call, so callers can assert on retry behavior deterministically.

use std::sync::Mutex;

use guardian_core::interfaces::BedAssessment;
use guardian_core::interfaces::BedAssessmentRequest;
use guardian_core::interfaces::PlanIncidentRequest;
use guardian_core::interfaces::PlanStrongRequest;
use guardian_core::interfaces::Planner;
use guardian_core::interfaces::PlannerError;
use guardian_core::interfaces::PlannerPlanDraft;

/// A [`Planner`] that always returns the same draft, for exercising
/// happy-path control flow.
#[derive(Debug, Clone)]
pub struct FakePlanner {
    draft: PlannerPlanDraft,
    bed_assessment: BedAssessment,
}

impl FakePlanner {
    /// Creates a fake planner that returns `draft` for every
    /// `plan_incident`/`plan_strong` call and `bed_assessment` for
    /// every `assess_bed` call.
    #[must_use]
    pub fn new(draft: PlannerPlanDraft, bed_assessment: BedAssessment) -> Self {
        Self { draft, bed_assessment }
    }
}

impl Planner for FakePlanner {
    fn plan_incident(&self, _request: &PlanIncidentRequest) -> Result<PlannerPlanDraft, PlannerError> {
        Ok(self.draft.clone())
    }

    fn plan_strong(&self, _request: &PlanStrongRequest) -> Result<PlannerPlanDraft, PlannerError> {
        Ok(self.draft.clone())
    }

    fn assess_bed(&self, _request: &BedAssessmentRequest) -> Result<BedAssessment, PlannerError> {
        Ok(self.bed_assessment)
    }
}

/// One canned response in a [`ScriptedPlanner`] queue.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Return this draft from the next `plan_incident`/`plan_strong` call.
    Plan(PlannerPlanDraft),
    /// Fail the next `plan_incident`/`plan_strong` call with this error.
    PlanError(PlannerError),
    /// Return this assessment from the next `assess_bed` call.
    Bed(BedAssessment),
    /// Fail the next `assess_bed` call with this error.
    BedError(PlannerError),
}

/// A [`Planner`] that replays a fixed queue of responses in order, one
/// per call, panicking if the queue runs dry.
///
/// # Invariants
/// - Plan-shaped responses (`Plan`/`PlanError`) and bed-shaped responses
///   (`Bed`/`BedError`) are drawn from the same queue, in call order.
pub struct ScriptedPlanner {
    responses: Mutex<std::collections::VecDeque<ScriptedResponse>>,
}

impl ScriptedPlanner {
    /// Creates a scripted planner that replays `responses` in order.
    #[must_use]
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    fn next(&self) -> ScriptedResponse {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .expect("scripted planner queue exhausted")
    }
}

impl Planner for ScriptedPlanner {
    fn plan_incident(&self, _request: &PlanIncidentRequest) -> Result<PlannerPlanDraft, PlannerError> {
        match self.next() {
            ScriptedResponse::Plan(draft) => Ok(draft),
            ScriptedResponse::PlanError(err) => Err(err),
            other => panic!("unexpected scripted response for plan_incident: {other:?}"),
        }
    }

    fn plan_strong(&self, _request: &PlanStrongRequest) -> Result<PlannerPlanDraft, PlannerError> {
        match self.next() {
            ScriptedResponse::Plan(draft) => Ok(draft),
            ScriptedResponse::PlanError(err) => Err(err),
            other => panic!("unexpected scripted response for plan_strong: {other:?}"),
        }
    }

    fn assess_bed(&self, _request: &BedAssessmentRequest) -> Result<BedAssessment, PlannerError> {
        match self.next() {
            ScriptedResponse::Bed(assessment) => Ok(assessment),
            ScriptedResponse::BedError(err) => Err(err),
            other => panic!("unexpected scripted response for assess_bed: {other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use super::FakePlanner;
    use super::ScriptedPlanner;
    use super::ScriptedResponse;
    use guardian_core::core::incident::Verdict;
    use guardian_core::core::severity::BedState;
    use guardian_core::core::severity::Stability;
    use guardian_core::interfaces::BedAssessment;
    use guardian_core::interfaces::PlanIncidentRequest;
    use guardian_core::interfaces::Planner;
    use guardian_core::interfaces::PlannerError;
    use guardian_core::interfaces::PlannerPlanDraft;

    fn draft() -> PlannerPlanDraft {
        PlannerPlanDraft {
            verdict: Verdict::PossibleFall,
            severity_seed: 3,
            confidence: 0.7,
            reasons: vec!["test".to_string()],
            actions: vec![],
            replan_interval_s: 10.0,
        }
    }

    #[test]
    fn fake_planner_always_returns_same_draft() {
        let planner = FakePlanner::new(
            draft(),
            BedAssessment {
                bed_state: BedState::InBed,
                stability: Stability::Stable,
            },
        );
        let request = PlanIncidentRequest {
            incident_id: None,
            camera_id: guardian_core::core::identifiers::CameraId::new("cam-1"),
            frames: vec![],
            motion: 0.1,
            stillness: 0.9,
            room_type: guardian_core::core::camera::RoomType::Bedroom,
            policy_text: String::new(),
            incident_state: None,
            agent_notes: vec![],
            mode: guardian_core::interfaces::PlannerMode::Incident,
        };
        let result = planner.plan_incident(&request).expect("fake planner never fails");
        assert_eq!(result.verdict, Verdict::PossibleFall);
    }

    #[test]
    fn scripted_planner_replays_queue_in_order() {
        let planner = ScriptedPlanner::new(vec![
            ScriptedResponse::PlanError(PlannerError::Unreachable("down".to_string())),
            ScriptedResponse::Plan(draft()),
        ]);
        let camera_id = guardian_core::core::identifiers::CameraId::new("cam-1");
        let request = PlanIncidentRequest {
            incident_id: None,
            camera_id,
            frames: vec![],
            motion: 0.1,
            stillness: 0.9,
            room_type: guardian_core::core::camera::RoomType::Bedroom,
            policy_text: String::new(),
            incident_state: None,
            agent_notes: vec![],
            mode: guardian_core::interfaces::PlannerMode::Incident,
        };
        assert!(planner.plan_incident(&request).is_err());
        assert!(planner.plan_incident(&request).is_ok());
    }
}
