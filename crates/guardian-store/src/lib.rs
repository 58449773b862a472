// crates/guardian-store/src/lib.rs
// ============================================================================
// Module: Guardian Store
// Description: Durable and in-memory `Datastore` implementations.
// Purpose: Persist cameras, incidents, plans, and the append-only
// timeline/action/note/config record set.
// Dependencies: guardian-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! `guardian-store` implements `guardian_core::interfaces::Datastore`
//! twice: [`sqlite::SqliteStore`] for durable deployments and
//! [`memory::InMemoryStore`] for tests and the CLI demo. Both share the
//! same query semantics; only persistence differs.

/// Engine-specific error type and its conversion to `StoreError`.
pub mod error;
/// In-memory `Datastore` for tests and the CLI demo.
pub mod memory;
/// `SQLite`-backed `Datastore`.
pub mod sqlite;
/// Connection setup and table creation for the `SQLite` store.
mod schema;
