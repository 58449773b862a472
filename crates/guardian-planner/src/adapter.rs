// crates/guardian-planner/src/adapter.rs
// ============================================================================
// Module: Planner Adapter
// Description: Retry-once-with-half-frames and deterministic-fallback
// policy wrapping any `Planner` implementation.
// Purpose: Guarantee `plan_incident` never blocks the incident controller
// past its timeout and never surfaces a raw planner error.
// Dependencies: guardian-core
// ============================================================================

//! ## Overview
//! `PlannerAdapter` is the only thing the incident controller calls for
//! incident plans. It enforces the planner call timeout, retries once
//! with half the frames on an invalid or unreachable response, and
//! falls back to the deterministic fallback plan on a second failure.
//! `plan_incident_or_fallback` therefore never returns `Err`.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use guardian_core::interfaces::PlanIncidentRequest;
use guardian_core::interfaces::Planner;
use guardian_core::interfaces::PlannerError;
use guardian_core::interfaces::PlannerPlanDraft;

use crate::fallback::fallback_plan;

/// Planner call timeout, adapter-enforced (spec.md §5).
pub const PLANNER_TIMEOUT: Duration = Duration::from_secs(30);

/// Wraps a [`Planner`] with the retry/fallback policy from spec.md
/// §4.3/§7.
pub struct PlannerAdapter {
    inner: Arc<dyn Planner + Send + Sync>,
}

impl PlannerAdapter {
    /// Wraps `inner` with the retry/fallback policy.
    #[must_use]
    pub fn new(inner: Arc<dyn Planner + Send + Sync>) -> Self {
        Self { inner }
    }

    /// Requests an incident plan. Retries once with half the frames on
    /// an invalid or unreachable response; on a second failure, returns
    /// the deterministic fallback plan. Never returns `Err`.
    #[must_use]
    pub fn plan_incident_or_fallback(&self, request: &PlanIncidentRequest, voice_enabled: bool) -> PlannerPlanDraft {
        if let Ok(draft) = self.call_with_timeout(request.clone()) {
            return draft;
        }
        let reduced = reduce_frames(request.clone());
        self.call_with_timeout(reduced).unwrap_or_else(|_| fallback_plan(request.motion, voice_enabled))
    }

    fn call_with_timeout(&self, request: PlanIncidentRequest) -> Result<PlannerPlanDraft, PlannerError> {
        let planner = Arc::clone(&self.inner);
        let (tx, rx) = mpsc::channel();
        let _ = thread::spawn(move || {
            let result = planner.plan_incident(&request);
            let _ = tx.send(result);
        });
        rx.recv_timeout(PLANNER_TIMEOUT)
            .unwrap_or_else(|_| Err(PlannerError::Unreachable("planner call timed out".to_string())))
    }
}

/// Halves the frame count, keeping the oldest half and never dropping
/// below one frame when any were present.
fn reduce_frames(mut request: PlanIncidentRequest) -> PlanIncidentRequest {
    if request.frames.len() > 1 {
        let half = request.frames.len() / 2;
        request.frames.truncate(half.max(1));
    }
    request
}
