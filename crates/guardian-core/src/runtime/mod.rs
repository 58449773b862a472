// crates/guardian-core/src/runtime/mod.rs
// ============================================================================
// Module: Guardian Core Runtime
// Description: Deterministic runtime components that require no I/O.
// Purpose: Single import surface for `guardian_core::runtime::*`.
// Dependencies: (module declarations only)
// ============================================================================

//! ## Overview
//! Everything under this module is synchronous and deterministic given
//! its inputs (modulo the guard's internal clock parameter, which is
//! caller-supplied). Components that need an async runtime or external
//! I/O live in `guardian-runtime`, not here.

/// Deterministic, stateful per-camera action admission filter.
pub mod guard;
