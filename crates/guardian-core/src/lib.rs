// crates/guardian-core/src/lib.rs
// ============================================================================
// Module: Guardian Core
// Description: Data model, identifiers, severity model, and safety guard
// for the fall-detection incident-response control loop.
// Purpose: Host the deterministic, dependency-free core that every other
// crate in this workspace builds on.
// Dependencies: (module declarations only)
// ============================================================================

//! ## Overview
//! `guardian-core` defines the entities (`Camera`, `Incident`,
//! `IncidentPlan`, `TimelineEvent`, ...), the narrow traits external
//! collaborators implement (`Planner`, `NotificationGateway`,
//! `Datastore`, `Warehouse`, `VisionTrigger`), and the two pure/
//! deterministic pieces of business logic that do not need an async
//! runtime: the severity model and the safety guard.

/// Entities and pure scoring functions that make up the data model.
pub mod core;
/// Backend-agnostic interfaces consumed by `guardian-runtime`.
pub mod interfaces;
/// Deterministic runtime components that require no I/O.
pub mod runtime;
