// crates/guardian-core/src/core/clock.rs
// ============================================================================
// Module: Clock
// Description: Wall-clock time source used for timeline events and plans.
// Purpose: Keep every timestamp-producing call behind a trait so tests can
// supply a fixed clock instead of reading the system clock.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Every record in this crate carries a real ISO-8601 wall-clock
//! timestamp (see `crate::core::incident` and `crate::core::timeline`),
//! not a replay-oriented logical clock. Runtime code never calls
//! `OffsetDateTime::now_utc()` directly; it goes through a [`Clock`] so
//! tests can hold time fixed.

use time::OffsetDateTime;

// ============================================================================
// SECTION: Clock Trait
// ============================================================================

/// A source of the current wall-clock time.
///
/// # Invariants
/// - `now` never panics.
pub trait Clock: Send + Sync {
    /// Returns the current time in UTC.
    fn now(&self) -> OffsetDateTime;
}

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// A [`Clock`] backed by the operating system's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

// ============================================================================
// SECTION: Fixed Clock
// ============================================================================

/// A [`Clock`] that always returns a fixed instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(OffsetDateTime);

impl FixedClock {
    /// Creates a fixed clock pinned to `instant`.
    #[must_use]
    pub const fn new(instant: OffsetDateTime) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use time::macros::datetime;

    use super::Clock;
    use super::FixedClock;

    #[test]
    fn fixed_clock_always_returns_same_instant() {
        let clock = FixedClock::new(datetime!(2026-01-01 00:00:00 UTC));
        assert_eq!(clock.now(), clock.now());
    }
}
