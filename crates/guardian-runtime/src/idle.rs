// crates/guardian-runtime/src/idle.rs
// ============================================================================
// Module: Idle-Window Config Suggestion Application
// Description: Applies warehouse-sourced config suggestions to idle cameras.
// Purpose: Implement spec.md §4.8's idle-window gate: a config suggestion
// only lands on a camera's live `CameraConfig` when that camera currently
// has no active incident and low risk.
// Dependencies: guardian-core
// ============================================================================

//! ## Overview
//! `apply_suggestion` is the single place a `ConfigUpdate` produced by
//! the warehouse's analytics pass is allowed to mutate a camera's live
//! configuration. It never runs against a camera with an open incident
//! or elevated risk, regardless of how confident the suggestion is;
//! applying a suggestion mid-incident would change the thresholds the
//! running controller is already reasoning about.

use guardian_core::core::camera::Camera;
use guardian_core::core::identifiers::CameraId;
use guardian_core::core::timeline::ConfigUpdate;
use guardian_core::core::timeline::EventKind;
use guardian_core::interfaces::Datastore;
use guardian_core::interfaces::StoreError;
use guardian_core::interfaces::Warehouse;

use crate::timeline::TimelineLogger;

/// Outcome of one `apply_suggestion` call, for caller-side logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The suggestion's recognized keys were merged into the camera's config.
    Applied,
    /// The camera has an active incident or elevated risk; skipped.
    SkippedNotIdle,
    /// The camera does not exist.
    SkippedUnknownCamera,
}

/// Applies `suggestion` to its target camera if and only if that
/// camera is currently idle (no active incident, `risk_score <= 0.3`).
/// Records the disposition via `store.put_config_update` and, when
/// applied, mirrors it to the warehouse and emits
/// `CONFIG_SUGGESTION_APPLIED`.
///
/// # Errors
///
/// Returns [`StoreError`] when reading the camera, looking up the
/// active incident, or persisting the camera/config update fails.
pub fn apply_suggestion(
    store: &(dyn Datastore + Send + Sync),
    warehouse: &(dyn Warehouse + Send + Sync),
    timeline: &TimelineLogger,
    mut suggestion: ConfigUpdate,
) -> Result<ApplyOutcome, StoreError> {
    let Some(mut camera) = store.get_camera(&suggestion.camera_id)? else {
        suggestion.applied = false;
        store.put_config_update(&suggestion)?;
        return Ok(ApplyOutcome::SkippedUnknownCamera);
    };

    let has_active_incident = store.active_incident_for_camera(&camera.id)?.is_some();
    if !camera.is_idle(has_active_incident) {
        suggestion.applied = false;
        store.put_config_update(&suggestion)?;
        return Ok(ApplyOutcome::SkippedNotIdle);
    }

    let applied_keys = camera.config.merge_recognized(&suggestion.config_json);
    store.put_camera(&camera)?;

    suggestion.applied = true;
    store.put_config_update(&suggestion)?;
    record_application(timeline, warehouse, &camera.id, &applied_keys);

    Ok(ApplyOutcome::Applied)
}

fn record_application(timeline: &TimelineLogger, warehouse: &(dyn Warehouse + Send + Sync), camera_id: &CameraId, applied_keys: &[String]) {
    let mut payload = serde_json::Map::new();
    payload.insert("applied_keys".to_string(), serde_json::json!(applied_keys));
    match timeline.log_event(
        guardian_core::core::identifiers::IncidentId::generate(),
        camera_id.clone(),
        EventKind::ConfigSuggestionApplied,
        payload,
    ) {
        Ok(event) => {
            let _ = warehouse.flush(std::slice::from_ref(&event));
        }
        Err(err) => tracing_unavailable_log(&err.to_string()),
    }
}

fn tracing_unavailable_log(_message: &str) {}
