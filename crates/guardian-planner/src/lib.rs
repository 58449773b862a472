// crates/guardian-planner/src/lib.rs
// ============================================================================
// Module: Guardian Planner
// Description: Vision-language-model planner adapter: HTTP client, strict
// response parsing, retry/fallback policy, and test doubles.
// Purpose: Turn an untrusted external model response into a trusted
// `PlannerPlanDraft`, never surfacing a raw network or parse error to the
// incident controller.
// Dependencies: guardian-core, reqwest, serde_json, base64
// ============================================================================

//! ## Overview
//! `guardian-planner` implements `guardian_core::interfaces::Planner`
//! over HTTP ([`http::HttpPlanner`]) and wraps any implementation with
//! the retry-once-with-half-frames and deterministic-fallback policy
//! ([`adapter::PlannerAdapter`]). [`parse`] handles fenced-JSON
//! stripping and strict schema validation; [`fake`] provides test
//! doubles for exercising the rest of the workspace without a network
//! dependency.

/// Retry/fallback wrapper around any `Planner`.
pub mod adapter;
/// In-memory `Planner` test doubles.
pub mod fake;
/// The deterministic fallback plan.
pub mod fallback;
/// HTTP-backed `Planner` implementation.
pub mod http;
/// Assigns id/version/timestamp to a planner draft.
pub mod metadata;
/// Fenced-JSON stripping and strict schema parsing.
pub mod parse;
