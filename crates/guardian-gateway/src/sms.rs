// crates/guardian-gateway/src/sms.rs
// ============================================================================
// Module: HTTP Notification Gateway
// Description: SMS and voice-call dispatch over HTTP.
// Purpose: Implement `NotificationGateway` against a provider endpoint
// that accepts JSON dispatch requests and returns an external id.
// Dependencies: guardian-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! `HttpNotificationGateway` posts an SMS or voice-call dispatch request
//! and returns the provider's external id for the corresponding
//! `ActionLog` entry. The voice-call flow per spec.md §6 expects the
//! provider to separately fetch a call-control document at a URL
//! parameterized by `incident_id`; this gateway only triggers the call
//! and relays the resulting external id, it does not serve that
//! document itself.

use guardian_core::core::identifiers::IncidentId;
use guardian_core::interfaces::GatewayError;
use guardian_core::interfaces::NotificationGateway;
use reqwest::Url;
use serde::Deserialize;
use serde::Serialize;

use crate::net::NetConfig;
use crate::net::send_pinned;

/// Configuration for [`HttpNotificationGateway`].
#[derive(Debug, Clone)]
pub struct HttpNotificationGatewayConfig {
    /// Endpoint that accepts `{"to", "body"}` and returns an external id.
    pub sms_endpoint: Url,
    /// Endpoint that accepts `{"to", "incident_id"}` and returns an external id.
    pub voice_endpoint: Url,
    /// Bearer token sent as `Authorization: Bearer <token>`.
    pub api_key: String,
    /// Shared network policy.
    pub net: NetConfig,
}

/// HTTP-backed [`NotificationGateway`].
#[derive(Debug, Clone)]
pub struct HttpNotificationGateway {
    config: HttpNotificationGatewayConfig,
}

impl HttpNotificationGateway {
    /// Creates a new HTTP notification gateway with the given configuration.
    #[must_use]
    pub fn new(config: HttpNotificationGatewayConfig) -> Self {
        Self { config }
    }
}

#[derive(Debug, Serialize)]
struct SmsRequest<'a> {
    to: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct VoiceRequest<'a> {
    to: &'a str,
    incident_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct DispatchResponse {
    external_id: String,
}

impl NotificationGateway for HttpNotificationGateway {
    fn send_sms(&self, to: &str, body: &str) -> Result<String, GatewayError> {
        if !self.config.net.allow_http && self.config.sms_endpoint.scheme() != "https" {
            return Err(GatewayError::ChannelDisabled("sms endpoint must use https".to_string()));
        }
        let payload = SmsRequest { to, body };
        let bytes = send_pinned(&self.config.sms_endpoint, &self.config.net, |client, url| {
            client.post(url.as_str()).bearer_auth(&self.config.api_key).json(&payload)
        })
        .map_err(|err| GatewayError::DeliveryFailed(err.to_string()))?;
        parse_external_id(&bytes)
    }

    fn start_voice_call(&self, to: &str, incident_id: &IncidentId) -> Result<String, GatewayError> {
        let payload = VoiceRequest { to, incident_id: incident_id.as_str() };
        let bytes = send_pinned(&self.config.voice_endpoint, &self.config.net, |client, url| {
            client.post(url.as_str()).bearer_auth(&self.config.api_key).json(&payload)
        })
        .map_err(|err| GatewayError::DeliveryFailed(err.to_string()))?;
        parse_external_id(&bytes)
    }
}

fn parse_external_id(bytes: &[u8]) -> Result<String, GatewayError> {
    let response: DispatchResponse =
        serde_json::from_slice(bytes).map_err(|err| GatewayError::DeliveryFailed(format!("invalid dispatch response: {err}")))?;
    Ok(response.external_id)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use super::DispatchResponse;

    #[test]
    fn dispatch_response_parses_external_id() {
        let parsed: DispatchResponse = serde_json::from_str(r#"{"external_id":"sms-123"}"#).expect("valid json");
        assert_eq!(parsed.external_id, "sms-123");
    }
}
