// crates/guardian-core/src/core/camera.rs
// ============================================================================
// Module: Camera Entities
// Description: Camera registration, notification policy, and config mapping.
// Purpose: Capture per-camera attributes mutated by registration and the
// prevention path.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A `Camera` is a monitored endpoint reused across incidents. It is
//! mutated only by registration/update APIs, prevention-path risk
//! updates, and idle config-apply (see `guardian-runtime::idle`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CameraId;

// ============================================================================
// SECTION: Room Type
// ============================================================================

/// Room classification used to contextualize planner prompts.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    /// Bedroom.
    Bedroom,
    /// Bathroom.
    Bathroom,
    /// Living room or common area.
    LivingRoom,
    /// Hallway or corridor.
    Hallway,
    /// Any other room type.
    Other,
}

// ============================================================================
// SECTION: Bed Polygon
// ============================================================================

/// A single 2D point in normalized frame coordinates.
///
/// # Invariants
/// - `x` and `y` are expected to lie in `[0.0, 1.0]`, but this type does
///   not enforce that; callers validate at the registration boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// Ordered bed polygon for bed-assessment queries.
///
/// # Invariants
/// - When present, contains at least 3 points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BedPolygon(Vec<Point2D>);

impl BedPolygon {
    /// Creates a bed polygon, returning `None` when fewer than 3 points
    /// are provided.
    #[must_use]
    pub fn new(points: Vec<Point2D>) -> Option<Self> {
        if points.len() >= 3 { Some(Self(points)) } else { None }
    }

    /// Returns the polygon points.
    #[must_use]
    pub fn points(&self) -> &[Point2D] {
        &self.0
    }
}

// ============================================================================
// SECTION: Notification Policy
// ============================================================================

/// Per-camera notification policy, created alongside the camera.
///
/// # Invariants
/// - `max_primary_call_attempts` bounds `START_VOICE_CALL_PRIMARY`
///   approvals between guard resets (see `guardian_core::runtime::guard`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotificationPolicy {
    /// SMS notifications enabled for this camera.
    pub sms_enabled: bool,
    /// Voice call notifications enabled for this camera.
    pub voice_enabled: bool,
    /// Seconds without acknowledgement before backup escalation.
    pub escalation_delay_s: f64,
    /// Minimum seconds between contact-class actions on this camera.
    pub cooldown_contact_s: f64,
    /// Maximum approved primary voice call attempts between guard resets.
    pub max_primary_call_attempts: u32,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            sms_enabled: true,
            voice_enabled: true,
            escalation_delay_s: 60.0,
            cooldown_contact_s: 5.0,
            max_primary_call_attempts: 2,
        }
    }
}

// ============================================================================
// SECTION: Camera Config Mapping
// ============================================================================

/// Recognized camera configuration keys and their effects.
///
/// # Invariants
/// - Only the fields below are ever read by the core; unknown keys found
///   in a raw config map (see `CameraConfig::from_map`) are preserved but
///   ignored, per spec.md's "Camera config mapping" (§3) and the idle
///   config-apply rule (§4.8) that only accepts listed keys.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Motion energy that implies elevated risk in prevention, in `[0,1]`.
    pub motion_spike_threshold: f64,
    /// Stillness that implies prolonged immobility, in `[0,1]`.
    pub stillness_threshold: f64,
    /// Lower risk gate; crossing it does not by itself trigger planning.
    pub risk_threshold_low: f64,
    /// Upper risk gate; only crossing this triggers prevention-mode planning.
    pub risk_threshold_high: f64,
    /// Seconds without acknowledgement before backup escalation.
    pub escalation_delay_s: f64,
    /// Nominal re-plan interval baseline, in seconds.
    pub check_interval_s: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            motion_spike_threshold: 0.5,
            stillness_threshold: 0.9,
            risk_threshold_low: 0.3,
            risk_threshold_high: 0.6,
            escalation_delay_s: 60.0,
            check_interval_s: 30.0,
        }
    }
}

/// Recognized config keys accepted by config-suggestion application (§4.8).
pub const RECOGNIZED_CONFIG_KEYS: &[&str] = &[
    "motion_spike_threshold",
    "stillness_threshold",
    "risk_threshold_low",
    "risk_threshold_high",
    "escalation_delay_s",
    "check_interval_s",
];

impl CameraConfig {
    /// Merges recognized keys from a raw JSON object into this config,
    /// ignoring any key not in [`RECOGNIZED_CONFIG_KEYS`].
    ///
    /// Returns the list of keys that were actually applied.
    pub fn merge_recognized(&mut self, patch: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
        let mut applied = Vec::new();
        for key in RECOGNIZED_CONFIG_KEYS {
            let Some(value) = patch.get(*key) else {
                continue;
            };
            let Some(number) = value.as_f64() else {
                continue;
            };
            match *key {
                "motion_spike_threshold" => self.motion_spike_threshold = number,
                "stillness_threshold" => self.stillness_threshold = number,
                "risk_threshold_low" => self.risk_threshold_low = number,
                "risk_threshold_high" => self.risk_threshold_high = number,
                "escalation_delay_s" => self.escalation_delay_s = number,
                "check_interval_s" => self.check_interval_s = number,
                _ => continue,
            }
            applied.push((*key).to_string());
        }
        applied
    }
}

// ============================================================================
// SECTION: Camera Status
// ============================================================================

/// Camera lifecycle status.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraStatus {
    /// Camera is registered and actively monitored.
    Active,
    /// Camera is registered but monitoring is paused.
    Paused,
    /// Camera has been decommissioned.
    Decommissioned,
}

// ============================================================================
// SECTION: Camera
// ============================================================================

/// A monitored camera endpoint, reused across incidents.
///
/// # Invariants
/// - `risk_score` is clamped to `[0,1]` by every writer.
/// - `bed_polygon`, when present, has at least 3 points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Camera identifier.
    pub id: CameraId,
    /// Human-readable name.
    pub name: String,
    /// Room classification.
    pub room_type: RoomType,
    /// Optional bed polygon for bed-state assessment.
    pub bed_polygon: Option<BedPolygon>,
    /// Primary contact string (phone number or equivalent).
    pub primary_contact: String,
    /// Backup contact string.
    pub backup_contact: String,
    /// Voice notifications enabled for this camera.
    pub voice_enabled: bool,
    /// SMS notifications enabled for this camera.
    pub sms_enabled: bool,
    /// Current prevention-path risk score, in `[0,1]`.
    pub risk_score: f64,
    /// Unix timestamp (seconds) of the last telemetry observed.
    pub last_seen: Option<i64>,
    /// Recognized configuration mapping.
    pub config: CameraConfig,
    /// Lifecycle status.
    pub status: CameraStatus,
    /// Notification policy for this camera.
    pub policy: NotificationPolicy,
}

impl Camera {
    /// Clamps and assigns a new risk score.
    pub fn set_risk_score(&mut self, risk: f64) {
        self.risk_score = risk.clamp(0.0, 1.0);
    }

    /// Returns true when the camera is idle per spec.md §4.8: risk at or
    /// below 0.3 and no active incident exists (caller supplies the
    /// latter, since that requires the datastore).
    #[must_use]
    pub fn is_idle(&self, has_active_incident: bool) -> bool {
        self.risk_score <= 0.3 && !has_active_incident
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use super::BedPolygon;
    use super::Point2D;

    #[test]
    fn bed_polygon_requires_at_least_three_points() {
        let points = vec![Point2D { x: 0.0, y: 0.0 }, Point2D { x: 1.0, y: 0.0 }];
        assert!(BedPolygon::new(points).is_none());
    }

    #[test]
    fn bed_polygon_accepts_three_points() {
        let points = vec![
            Point2D { x: 0.0, y: 0.0 },
            Point2D { x: 1.0, y: 0.0 },
            Point2D { x: 0.5, y: 1.0 },
        ];
        assert!(BedPolygon::new(points).is_some());
    }
}
