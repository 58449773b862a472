// crates/guardian-core/src/core/identifiers.rs
// ============================================================================
// Module: Guardian Identifiers
// Description: Canonical opaque identifiers for cameras, incidents, and
// their associated records.
// Purpose: Provide strongly typed, serializable identifiers with stable
// wire forms.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Camera identifiers are externally assigned (fleet registration) and are
//! therefore opaque validated strings. All other identifiers are generated
//! by this service using UUID v4 and are opaque on the wire.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: Macro: String-Backed Identifier
// ============================================================================

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization is applied by this type.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from an owned or borrowed string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Macro: UUID-Backed Identifier
// ============================================================================

macro_rules! uuid_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        ///
        /// # Invariants
        /// - Always a valid UUID; serializes as its canonical string form.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn get(self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::generate()
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_id!(CameraId, "Externally assigned camera/endpoint identifier.");

uuid_id!(IncidentId, "Identifier for one active fall/edge incident.");
uuid_id!(PlanId, "Identifier for one immutable `IncidentPlan` record.");
uuid_id!(TimelineEventId, "Identifier for one append-only timeline event.");
uuid_id!(ActionLogId, "Identifier for one executed-action log record.");
uuid_id!(AgentNoteId, "Identifier for one caregiver free-text note.");

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use super::CameraId;
    use super::IncidentId;

    #[test]
    fn camera_id_round_trips_through_json() {
        let id = CameraId::new("cam-front-door");
        let json = serde_json::to_string(&id).expect("serialize camera id");
        assert_eq!(json, "\"cam-front-door\"");
        let back: CameraId = serde_json::from_str(&json).expect("deserialize camera id");
        assert_eq!(back, id);
    }

    #[test]
    fn incident_ids_are_unique() {
        let a = IncidentId::generate();
        let b = IncidentId::generate();
        assert_ne!(a, b);
    }
}
