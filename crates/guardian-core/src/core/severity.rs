// crates/guardian-core/src/core/severity.rs
// ============================================================================
// Module: Severity Model
// Description: Pure, deterministic severity and risk scoring functions.
// Purpose: Compute the `severity` used to gate escalation and the `risk`
// used to gate prevention-mode planning, with no side effects.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every function in this module is pure and side-effect-free so it can
//! be property-tested directly; none of them touch the clock, the
//! datastore, or any collaborator trait.

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Bed State
// ============================================================================

/// Coarse bed-relative posture classification fed into [`risk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BedState {
    /// Subject is in bed.
    InBed,
    /// Subject is near the edge of the bed.
    NearEdge,
    /// Subject is sitting on the edge of the bed.
    SittingEdge,
    /// Subject's legs are over the edge of the bed.
    LegsOver,
    /// Subject is standing near the bed.
    StandingNearBed,
    /// Subject is out of bed.
    OutOfBed,
    /// Bed-relative posture could not be determined.
    Unknown,
}

impl BedState {
    fn base_contribution(self) -> f64 {
        match self {
            Self::InBed => 0.0,
            Self::NearEdge => 0.2,
            Self::SittingEdge => 0.4,
            Self::LegsOver => 0.6,
            Self::StandingNearBed => 0.3,
            Self::OutOfBed => 0.1,
            Self::Unknown => 0.15,
        }
    }
}

// ============================================================================
// SECTION: Stability
// ============================================================================

/// Posture stability classification fed into [`risk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stability {
    /// Subject appears stable.
    Stable,
    /// Subject appears unstable (e.g. swaying, gripping furniture).
    Unstable,
    /// Stability could not be determined.
    Unknown,
}

impl Stability {
    fn contribution(self) -> f64 {
        match self {
            Self::Stable => 0.0,
            Self::Unstable => 0.25,
            Self::Unknown => 0.1,
        }
    }
}

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Computes incident severity in `1..=5` from the current observation.
///
/// `seed` is the prior severity (or an initial classifier estimate on
/// the first call). `t_down_s` is seconds since the subject was first
/// observed down. `stillness` and `motion` are in `[0,1]`. `acked` is
/// whether a caregiver has acknowledged the incident.
#[must_use]
pub fn severity(seed: u8, t_down_s: f64, stillness: f64, motion: f64, acked: bool) -> u8 {
    let mut value = seed;

    if t_down_s > 120.0 {
        value = value.max(5);
    } else if t_down_s > 45.0 {
        value = value.max(4);
    } else if t_down_s > 15.0 {
        value = value.max(3);
    }

    if stillness > 0.9 && t_down_s > 30.0 {
        value = value.saturating_add(1);
    }

    if motion > 0.5 && stillness < 0.3 {
        value = value.saturating_sub(1);
    }

    if acked {
        value = value.saturating_sub(1);
    }

    value.clamp(1, 5)
}

// ============================================================================
// SECTION: Risk
// ============================================================================

/// Computes prevention-path risk in `[0,1]` from bed state, stability,
/// and the hour of day (`0..=23`, local or camera-configured time).
#[must_use]
pub fn risk(bed_state: BedState, stability: Stability, hour: u8) -> f64 {
    let mut value = bed_state.base_contribution() + stability.contribution();

    if hour >= 22 || hour <= 5 {
        value += 0.1;
    }

    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use proptest::prelude::*;

    use super::risk;
    use super::severity;
    use super::BedState;
    use super::Stability;

    #[test]
    fn severity_clamps_to_closed_range() {
        assert_eq!(severity(1, 0.0, 0.0, 0.0, false), 1);
        assert_eq!(severity(5, 200.0, 0.95, 0.0, false), 5);
    }

    #[test]
    fn severity_escalates_with_time_down() {
        assert!(severity(1, 16.0, 0.0, 0.0, false) >= 3);
        assert!(severity(1, 46.0, 0.0, 0.0, false) >= 4);
        assert!(severity(1, 121.0, 0.0, 0.0, false) >= 5);
    }

    #[test]
    fn severity_acknowledgement_reduces_by_one() {
        let unacked = severity(3, 20.0, 0.0, 0.0, false);
        let acked = severity(3, 20.0, 0.0, 0.0, true);
        assert_eq!(acked, unacked.saturating_sub(1).max(1));
    }

    #[test]
    fn risk_is_zero_for_in_bed_stable_daytime() {
        assert_eq!(risk(BedState::InBed, Stability::Stable, 14), 0.0);
    }

    #[test]
    fn risk_accounts_for_night_window() {
        let day = risk(BedState::NearEdge, Stability::Stable, 14);
        let night = risk(BedState::NearEdge, Stability::Stable, 23);
        assert!((night - day - 0.1).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn severity_always_in_closed_range(
            seed in 0u8..=255,
            t_down_s in 0.0f64..1000.0,
            stillness in 0.0f64..1.0,
            motion in 0.0f64..1.0,
            acked: bool,
        ) {
            let value = severity(seed, t_down_s, stillness, motion, acked);
            prop_assert!((1..=5).contains(&value));
        }

        #[test]
        fn risk_always_in_unit_interval(hour in 0u8..24) {
            for bed_state in [
                BedState::InBed,
                BedState::NearEdge,
                BedState::SittingEdge,
                BedState::LegsOver,
                BedState::StandingNearBed,
                BedState::OutOfBed,
                BedState::Unknown,
            ] {
                for stability in [Stability::Stable, Stability::Unstable, Stability::Unknown] {
                    let value = risk(bed_state, stability, hour);
                    prop_assert!((0.0..=1.0).contains(&value));
                }
            }
        }
    }
}
