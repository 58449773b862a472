// crates/guardian-gateway/src/warehouse.rs
// ============================================================================
// Module: HTTP Warehouse
// Description: Best-effort analytics sink over HTTP.
// Purpose: Implement `Warehouse` against an ingestion endpoint that
// accepts batches of timeline events and serves config-optimization
// suggestions.
// Dependencies: guardian-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! `HttpWarehouse` flushes batches of `TimelineEvent`s and reads
//! pending `ConfigUpdate` suggestions for the idle-window config
//! apply path (spec.md §4.7/§4.8). Per spec.md §6, warehouse failures
//! never affect live behavior: callers drop the batch on error rather
//! than retrying indefinitely (`guardian-runtime`'s bounded flush
//! buffer does that dropping).

use guardian_core::core::timeline::ConfigUpdate;
use guardian_core::core::timeline::TimelineEvent;
use guardian_core::interfaces::Warehouse;
use guardian_core::interfaces::WarehouseError;
use reqwest::Url;
use serde::Serialize;

use crate::net::NetConfig;
use crate::net::send_pinned;

/// Configuration for [`HttpWarehouse`].
#[derive(Debug, Clone)]
pub struct HttpWarehouseConfig {
    /// Endpoint that accepts a JSON array of `TimelineEvent`s.
    pub flush_endpoint: Url,
    /// Endpoint that returns pending `ConfigUpdate` suggestions.
    pub suggestions_endpoint: Url,
    /// Bearer token sent as `Authorization: Bearer <token>`.
    pub api_key: String,
    /// Shared network policy.
    pub net: NetConfig,
}

/// HTTP-backed [`Warehouse`].
#[derive(Debug, Clone)]
pub struct HttpWarehouse {
    config: HttpWarehouseConfig,
}

impl HttpWarehouse {
    /// Creates a new HTTP warehouse with the given configuration.
    #[must_use]
    pub fn new(config: HttpWarehouseConfig) -> Self {
        Self { config }
    }
}

#[derive(Debug, Serialize)]
struct FlushBatch<'a> {
    events: &'a [TimelineEvent],
}

impl Warehouse for HttpWarehouse {
    fn flush(&self, events: &[TimelineEvent]) -> Result<(), WarehouseError> {
        if events.is_empty() {
            return Ok(());
        }
        let payload = FlushBatch { events };
        send_pinned(&self.config.flush_endpoint, &self.config.net, |client, url| {
            client.post(url.as_str()).bearer_auth(&self.config.api_key).json(&payload)
        })
        .map_err(|err| WarehouseError::DeliveryFailed(err.to_string()))?;
        Ok(())
    }

    fn read_config_suggestions(&self) -> Result<Vec<ConfigUpdate>, WarehouseError> {
        let bytes = send_pinned(&self.config.suggestions_endpoint, &self.config.net, |client, url| {
            client.get(url.as_str()).bearer_auth(&self.config.api_key)
        })
        .map_err(|err| WarehouseError::DeliveryFailed(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| WarehouseError::DeliveryFailed(format!("invalid suggestions response: {err}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use super::FlushBatch;
    use guardian_core::core::identifiers::CameraId;
    use guardian_core::core::identifiers::IncidentId;
    use guardian_core::core::identifiers::TimelineEventId;
    use guardian_core::core::timeline::EventKind;
    use guardian_core::core::timeline::TimelineEvent;

    #[test]
    fn flush_batch_serializes_events() {
        let event = TimelineEvent {
            id: TimelineEventId::generate(),
            incident_id: IncidentId::generate(),
            camera_id: CameraId::new("cam-1"),
            kind: EventKind::TriggerReceived,
            ts: time::OffsetDateTime::UNIX_EPOCH,
            payload: serde_json::Map::new(),
        };
        let events = vec![event];
        let batch = FlushBatch { events: &events };
        let value = serde_json::to_value(&batch).expect("serializable batch");
        assert!(value["events"].is_array());
    }
}
