// crates/guardian-gateway/src/lib.rs
// ============================================================================
// Module: Guardian Gateway
// Description: HTTP-backed notification and warehouse collaborators.
// Purpose: Implement the external-facing `NotificationGateway` and
// `Warehouse` traits with the same fail-closed network posture as the
// rest of this workspace's outbound calls.
// Dependencies: guardian-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! `guardian-gateway` implements `guardian_core::interfaces::NotificationGateway`
//! ([`sms::HttpNotificationGateway`]) and `guardian_core::interfaces::Warehouse`
//! ([`warehouse::HttpWarehouse`]) over HTTP, sharing the DNS-pinned,
//! redirect-free, size-capped transport in [`net`].

/// Shared pinned-HTTP transport used by every sink in this crate.
pub mod net;
/// SMS/voice dispatch over HTTP.
pub mod sms;
/// Analytics warehouse sink over HTTP.
pub mod warehouse;
