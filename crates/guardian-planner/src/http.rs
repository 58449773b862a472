// crates/guardian-planner/src/http.rs
// ============================================================================
// Module: HTTP Planner
// Description: Planner implementation that posts incident frames and
// context to a vision-language model endpoint over HTTP.
// Purpose: Provide the real `Planner` used in production, with the same
// fail-closed network posture as the rest of this workspace's outbound
// HTTP calls.
// Dependencies: guardian-core, reqwest, serde_json, base64
// ============================================================================

//! ## Overview
//! `HttpPlanner` posts a JSON chat-completion-style request carrying
//! base64-encoded JPEG frames to a configured endpoint and parses the
//! response through [`crate::parse`]. It enforces scheme restriction,
//! host allowlisting, DNS pinning against the resolved address (not the
//! hostname a redirect might later resolve to), private/link-local IP
//! blocking, no redirects, and a response size cap. Security posture:
//! planner output is untrusted; [`crate::parse`] is the only place that
//! turns it back into trusted domain types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io::Read;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use guardian_core::interfaces::BedAssessment;
use guardian_core::interfaces::BedAssessmentRequest;
use guardian_core::interfaces::Frame;
use guardian_core::interfaces::PlanIncidentRequest;
use guardian_core::interfaces::PlanStrongRequest;
use guardian_core::interfaces::Planner;
use guardian_core::interfaces::PlannerError;
use guardian_core::interfaces::PlannerPlanDraft;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use serde::Serialize;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP planner.
///
/// # Invariants
/// - `allow_http = false` blocks cleartext `http://` endpoints.
/// - `max_response_bytes` is a hard upper bound on the model's response body.
/// - If `allowed_hosts` is set, only listed hosts are permitted.
/// - `allow_private_networks = false` blocks private/link-local/loopback targets.
/// - `timeout_ms` applies to the full request lifecycle, including connect.
#[derive(Debug, Clone)]
pub struct HttpPlannerConfig {
    /// Endpoint that accepts chat-completion-style requests.
    pub endpoint: Url,
    /// Bearer token sent as `Authorization: Bearer <token>`.
    pub api_key: String,
    /// Allow cleartext HTTP (disabled by default).
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// Optional host allowlist.
    pub allowed_hosts: Option<BTreeSet<String>>,
    /// Allow requests to private/link-local/loopback addresses.
    pub allow_private_networks: bool,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl HttpPlannerConfig {
    /// Builds a config pointed at `endpoint` with documented defaults for
    /// everything else.
    #[must_use]
    pub fn new(endpoint: Url, api_key: String) -> Self {
        Self {
            endpoint,
            api_key,
            allow_http: false,
            timeout_ms: 30_000,
            max_response_bytes: 1024 * 1024,
            allowed_hosts: None,
            allow_private_networks: false,
            user_agent: "guardian-planner/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Planner Implementation
// ============================================================================

/// Vision-language-model-backed [`Planner`].
///
/// # Invariants
/// - Redirects are never followed.
/// - Responses exceeding configured limits fail closed (an error, never a
///   truncated parse).
pub struct HttpPlanner {
    config: HttpPlannerConfig,
    client: Client,
}

impl HttpPlanner {
    /// Creates a new HTTP planner with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Unreachable`] when the HTTP client cannot be
    /// built.
    pub fn new(config: HttpPlannerConfig) -> Result<Self, PlannerError> {
        let client = build_http_client(&config, None)?;
        Ok(Self { config, client })
    }

    fn call(&self, body: &ChatRequest<'_>) -> Result<String, PlannerError> {
        let resolved = resolve_request_host(&self.config.endpoint, &self.config)?;
        let mut response = self.send_pinned_request(body, &resolved)?;
        let bytes = read_response_limited(&mut response, self.config.max_response_bytes)?;
        let text = String::from_utf8(bytes)
            .map_err(|err| PlannerError::InvalidResponse(format!("non-utf8 response: {err}")))?;
        Ok(text)
    }

    fn send_pinned_request(&self, body: &ChatRequest<'_>, resolved: &ResolvedHost) -> Result<Response, PlannerError> {
        let mut last_error: Option<PlannerError> = None;
        for ip in &resolved.ips {
            let client = match self.client_for_ip(resolved, *ip) {
                Ok(client) => client,
                Err(err) => {
                    last_error = Some(err);
                    continue;
                }
            };
            let sent = client
                .post(self.config.endpoint.as_str())
                .bearer_auth(&self.config.api_key)
                .json(body)
                .send();
            let Ok(response) = sent else {
                last_error = Some(PlannerError::Unreachable("planner request failed".to_string()));
                continue;
            };
            if response.url() != &self.config.endpoint {
                return Err(PlannerError::Unreachable("planner redirect not allowed".to_string()));
            }
            enforce_ip_policy(&resolved.host_label, *ip, self.config.allow_private_networks)?;
            return Ok(response);
        }
        Err(last_error.unwrap_or_else(|| PlannerError::Unreachable("planner request failed".to_string())))
    }

    fn client_for_ip(&self, resolved: &ResolvedHost, ip: IpAddr) -> Result<Client, PlannerError> {
        if !resolved.is_domain {
            return Ok(self.client.clone());
        }
        let socket_addr = SocketAddr::new(ip, resolved.port);
        build_http_client(&self.config, Some((&resolved.host, socket_addr)))
    }
}

impl Planner for HttpPlanner {
    fn plan_incident(&self, request: &PlanIncidentRequest) -> Result<PlannerPlanDraft, PlannerError> {
        let body = ChatRequest {
            system: INCIDENT_SYSTEM_PROMPT,
            frames: &request.frames,
            context: serde_json::json!({
                "motion": request.motion,
                "stillness": request.stillness,
                "room_type": request.room_type,
                "policy_text": request.policy_text,
                "incident_state": request.incident_state,
                "mode": request.mode,
            }),
        };
        let raw = self.call(&body)?;
        crate::parse::parse_plan_response(&raw)
    }

    fn plan_strong(&self, request: &PlanStrongRequest) -> Result<PlannerPlanDraft, PlannerError> {
        let body = ChatRequest {
            system: STRONG_VERIFY_SYSTEM_PROMPT,
            frames: &request.frames,
            context: serde_json::json!({
                "motion": request.motion,
                "stillness": request.stillness,
                "current_plan": request.current_plan,
                "incident_state": request.incident_state,
            }),
        };
        let raw = self.call(&body)?;
        crate::parse::parse_plan_response(&raw)
    }

    fn assess_bed(&self, request: &BedAssessmentRequest) -> Result<BedAssessment, PlannerError> {
        let body = ChatRequest {
            system: BED_ASSESSMENT_SYSTEM_PROMPT,
            frames: &request.frames,
            context: serde_json::json!({
                "bed_polygon": request.bed_polygon,
                "room_type": request.room_type,
            }),
        };
        let raw = self.call(&body)?;
        crate::parse::parse_bed_assessment(&raw)
    }
}

const INCIDENT_SYSTEM_PROMPT: &str =
    "Assess the frames for a fall or near-fall and respond with the plan JSON schema.";
const STRONG_VERIFY_SYSTEM_PROMPT: &str =
    "Re-assess at higher fidelity whether the current plan's verdict still holds.";
const BED_ASSESSMENT_SYSTEM_PROMPT: &str = "Assess bed occupancy state and stability from the frames.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    system: &'a str,
    #[serde(serialize_with = "serialize_frames")]
    frames: &'a [Frame],
    context: serde_json::Value,
}

fn serialize_frames<S>(frames: &&[Frame], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeSeq;
    let mut seq = serializer.serialize_seq(Some(frames.len()))?;
    for frame in frames.iter() {
        seq.serialize_element(&BASE64.encode(&frame.bytes))?;
    }
    seq.end()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates scheme, credentials, and allowlist policy for the endpoint.
fn validate_url(url: &Url, config: &HttpPlannerConfig) -> Result<(), PlannerError> {
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        _ => return Err(PlannerError::Unreachable("unsupported endpoint scheme".to_string())),
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(PlannerError::Unreachable("endpoint credentials are not allowed".to_string()));
    }
    if let Some(allowlist) = &config.allowed_hosts {
        let host = normalize_host_label(
            url.host_str().ok_or_else(|| PlannerError::Unreachable("endpoint host required".to_string()))?,
        );
        let allowed = allowlist.iter().any(|entry| normalize_host_label(entry.as_str()) == host);
        if !allowed {
            return Err(PlannerError::Unreachable("endpoint host not allowed".to_string()));
        }
    }
    Ok(())
}

/// Resolves host metadata and validates address policy before requests.
fn resolve_request_host(url: &Url, config: &HttpPlannerConfig) -> Result<ResolvedHost, PlannerError> {
    validate_url(url, config)?;
    let host = url.host_str().ok_or_else(|| PlannerError::Unreachable("endpoint host required".to_string()))?;
    let host_label = normalize_host_label(host);
    let host_for_resolution = host.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(host);
    let port = url.port_or_known_default().ok_or_else(|| PlannerError::Unreachable("endpoint port required".to_string()))?;
    let mut ips = resolve_host_ips(host_for_resolution, port)?;
    if ips.is_empty() {
        return Err(PlannerError::Unreachable("endpoint host has no resolved addresses".to_string()));
    }
    for ip in &ips {
        enforce_ip_policy(&host_label, *ip, config.allow_private_networks)?;
    }
    dedupe_ips(&mut ips);
    Ok(ResolvedHost {
        host: host_for_resolution.to_string(),
        host_label,
        port,
        ips,
        is_domain: host_for_resolution.parse::<IpAddr>().is_err(),
    })
}

/// Builds an HTTP client with optional DNS pinning override.
fn build_http_client(config: &HttpPlannerConfig, resolve: Option<(&str, SocketAddr)>) -> Result<Client, PlannerError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .redirect(Policy::none());
    if let Some((host, socket_addr)) = resolve {
        builder = builder.resolve(host, socket_addr);
    }
    builder.build().map_err(|_| PlannerError::Unreachable("http client build failed".to_string()))
}

/// Resolves hostnames to peer IPs used for policy checks and pinning.
fn resolve_host_ips(host: &str, port: u16) -> Result<Vec<IpAddr>, PlannerError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }
    (host, port)
        .to_socket_addrs()
        .map(|iter| iter.map(|addr| addr.ip()).collect::<Vec<IpAddr>>())
        .map_err(|_| PlannerError::Unreachable("endpoint host resolution failed".to_string()))
}

/// Enforces private/link-local restrictions for resolved peer IPs.
fn enforce_ip_policy(host_label: &str, ip: IpAddr, allow_private_networks: bool) -> Result<(), PlannerError> {
    if allow_private_networks {
        return Ok(());
    }
    if is_private_or_link_local(&ip) {
        return Err(PlannerError::Unreachable(format!(
            "endpoint host resolves to private or link-local address: {host_label}"
        )));
    }
    Ok(())
}

/// Returns true when an IP is private, loopback, link-local, or otherwise local.
const fn is_private_or_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => {
            addr.is_private()
                || addr.is_loopback()
                || addr.is_link_local()
                || addr.is_unspecified()
                || addr.is_multicast()
                || addr.is_broadcast()
        }
        IpAddr::V6(addr) => {
            let mapped_private = if let Some(mapped) = addr.to_ipv4_mapped() {
                mapped.is_private()
                    || mapped.is_loopback()
                    || mapped.is_link_local()
                    || mapped.is_unspecified()
                    || mapped.is_multicast()
                    || mapped.is_broadcast()
            } else {
                false
            };
            mapped_private
                || addr.is_loopback()
                || addr.is_unique_local()
                || addr.is_unicast_link_local()
                || addr.is_unspecified()
                || addr.is_multicast()
        }
    }
}

/// Normalizes host labels for allowlist comparisons.
fn normalize_host_label(host: &str) -> String {
    let trimmed = host.trim_end_matches('.');
    let trimmed = trimmed.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(trimmed);
    trimmed.to_ascii_lowercase()
}

/// Deduplicates IP addresses while preserving insertion order.
fn dedupe_ips(ips: &mut Vec<IpAddr>) {
    let mut unique = Vec::with_capacity(ips.len());
    for ip in ips.drain(..) {
        if !unique.contains(&ip) {
            unique.push(ip);
        }
    }
    *ips = unique;
}

/// Resolved host metadata for pinned outbound requests.
///
/// # Invariants
/// - `ips` is non-empty and deduplicated.
/// - `port` is the effective request port.
struct ResolvedHost {
    /// Host string as it appears in the URL.
    host: String,
    /// Normalized host label used in policy messages.
    host_label: String,
    /// Effective request port.
    port: u16,
    /// Resolved candidate peer IPs.
    ips: Vec<IpAddr>,
    /// True when host represents a DNS domain name.
    is_domain: bool,
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, PlannerError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| PlannerError::Unreachable("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len {
        if expected > max_bytes_u64 {
            return Err(PlannerError::Unreachable("planner response exceeds size limit".to_string()));
        }
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle.read_to_end(&mut buf).map_err(|_| PlannerError::Unreachable("failed to read planner response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(PlannerError::Unreachable("planner response exceeds size limit".to_string()));
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected)
            .map_err(|_| PlannerError::Unreachable("invalid response length".to_string()))?;
        if buf.len() < expected {
            return Err(PlannerError::Unreachable("planner response truncated".to_string()));
        }
    }
    Ok(buf)
}
