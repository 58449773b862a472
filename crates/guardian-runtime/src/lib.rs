// crates/guardian-runtime/src/lib.rs
// ============================================================================
// Module: Guardian Runtime
// Description: Timeline logger/broadcast/flush, action executor, incident
// controller, trigger router, scheduler, and idle window.
// Purpose: Host the tokio control loop that turns triggers into dispatched
// actions and a durable, best-effort audit trail.
// Dependencies: guardian-core, guardian-planner, tokio
// ============================================================================

//! ## Overview
//! `guardian-runtime` is the only crate in this workspace that depends on
//! `tokio`. It wires the deterministic pieces in `guardian-core`
//! (severity model, safety guard) and `guardian-planner` (planner
//! adapter) into a live control loop: one [`controller::IncidentController`]
//! task per active incident, a [`trigger::TriggerRouter`] that creates or
//! attaches to incidents, a [`scheduler::Scheduler`] driving periodic
//! warehouse flush and config optimization, and an
//! [`idle::apply_suggestion`] gate for prevention-path config patches.
//! Every collaborator (`Planner`, `NotificationGateway`, `Datastore`,
//! `Warehouse`) is consumed only through the trait objects defined in
//! `guardian_core::interfaces`; blocking trait calls are always wrapped
//! in `tokio::task::spawn_blocking`.

/// Bounded, drop-slow-subscriber fan-out for live timeline events.
pub mod broadcast;
/// Per-incident controller task: state machine, replan loop, severity ticker.
pub mod controller;
/// Sequential plan-action dispatch.
pub mod executor;
/// Idle-window config-suggestion application.
pub mod idle;
/// In-process registry of running incident controllers.
pub mod registry;
/// Periodic warehouse-flush and config-optimization tasks.
pub mod scheduler;
/// Durable append + bounded buffer + broadcast fan-out for timeline events.
pub mod timeline;
/// Prevention telemetry and fall/edge/explicit-trigger entry points.
pub mod trigger;
