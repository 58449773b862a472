// crates/guardian-gateway/src/net.rs
// ============================================================================
// Module: Pinned HTTP Transport
// Description: Shared DNS-pinned, redirect-free, size-capped HTTP
// transport used by both the notification sinks and the warehouse sink.
// Purpose: Give every outbound call in this crate the same fail-closed
// network posture, without duplicating it per sink.
// Dependencies: reqwest
// ============================================================================

//! ## Overview
//! Every outbound call this crate makes (SMS, voice, warehouse flush)
//! goes through [`send_pinned`]: DNS resolution happens once, every
//! candidate peer IP is checked against the private/link-local policy,
//! redirects are rejected, and the response body is read under a hard
//! byte cap. Security posture: downstream services are external
//! collaborators; never trust their response bytes beyond the cap.

use std::io::Read;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;

/// A transport-level failure, rendered by callers into their own error type.
#[derive(Debug, Clone)]
pub struct NetError(pub String);

impl std::fmt::Display for NetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Network policy shared by every sink in this crate.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Allow cleartext HTTP (disabled by default).
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// Allow requests to private/link-local/loopback addresses.
    pub allow_private_networks: bool,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            allow_http: false,
            timeout_ms: 10_000,
            max_response_bytes: 256 * 1024,
            allow_private_networks: false,
            user_agent: "guardian-gateway/0.1".to_string(),
        }
    }
}

/// Sends a request built from `build`, pinned to the endpoint's resolved
/// IP, rejecting redirects, and reading the body under the configured
/// size cap.
///
/// # Errors
///
/// Returns [`NetError`] when the URL fails policy checks, no candidate
/// peer accepts the connection, a redirect is observed, or the response
/// exceeds the size cap.
pub fn send_pinned(
    endpoint: &Url,
    config: &NetConfig,
    build: impl Fn(&Client, &Url) -> RequestBuilder,
) -> Result<Vec<u8>, NetError> {
    validate_url(endpoint, config)?;
    let resolved = resolve_request_host(endpoint, config)?;

    let mut last_error: Option<NetError> = None;
    for ip in &resolved.ips {
        let client = match client_for_ip(&resolved, *ip, config) {
            Ok(client) => client,
            Err(err) => {
                last_error = Some(err);
                continue;
            }
        };
        let sent = build(&client, endpoint).send();
        let Ok(mut response) = sent else {
            last_error = Some(NetError("request failed".to_string()));
            continue;
        };
        if response.url() != endpoint {
            return Err(NetError("redirect not allowed".to_string()));
        }
        enforce_ip_policy(&resolved.host_label, *ip, config.allow_private_networks)?;
        if !response.status().is_success() {
            return Err(NetError(format!("http status {}", response.status())));
        }
        return read_response_limited(&mut response, config.max_response_bytes);
    }
    Err(last_error.unwrap_or_else(|| NetError("request failed for all resolved peers".to_string())))
}

fn validate_url(url: &Url, config: &NetConfig) -> Result<(), NetError> {
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        _ => return Err(NetError("unsupported url scheme".to_string())),
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(NetError("url credentials are not allowed".to_string()));
    }
    Ok(())
}

struct ResolvedHost {
    host: String,
    host_label: String,
    port: u16,
    ips: Vec<IpAddr>,
    is_domain: bool,
}

fn resolve_request_host(url: &Url, config: &NetConfig) -> Result<ResolvedHost, NetError> {
    let host = url.host_str().ok_or_else(|| NetError("url host required".to_string()))?;
    let host_label = normalize_host_label(host);
    let host_for_resolution = host.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(host);
    let port = url.port_or_known_default().ok_or_else(|| NetError("url port required".to_string()))?;
    let mut ips = resolve_host_ips(host_for_resolution, port)?;
    if ips.is_empty() {
        return Err(NetError("url host has no resolved addresses".to_string()));
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

fn client_for_ip(resolved: &ResolvedHost, ip: IpAddr, config: &NetConfig) -> Result<Client, NetError> {
    if !resolved.is_domain {
        return build_http_client(config, None);
    }
    let socket_addr = SocketAddr::new(ip, resolved.port);
    build_http_client(config, Some((&resolved.host, socket_addr)))
}

fn build_http_client(config: &NetConfig, resolve: Option<(&str, SocketAddr)>) -> Result<Client, NetError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .redirect(Policy::none());
    if let Some((host, socket_addr)) = resolve {
        builder = builder.resolve(host, socket_addr);
    }
    builder.build().map_err(|_| NetError("http client build failed".to_string()))
}

fn resolve_host_ips(host: &str, port: u16) -> Result<Vec<IpAddr>, NetError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }
    (host, port)
        .to_socket_addrs()
        .map(|iter| iter.map(|addr| addr.ip()).collect::<Vec<IpAddr>>())
        .map_err(|_| NetError("host resolution failed".to_string()))
}

fn enforce_ip_policy(host_label: &str, ip: IpAddr, allow_private_networks: bool) -> Result<(), NetError> {
    if allow_private_networks {
        return Ok(());
    }
    if is_private_or_link_local(&ip) {
        return Err(NetError(format!("host resolves to private or link-local address: {host_label}")));
    }
    Ok(())
}

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

fn normalize_host_label(host: &str) -> String {
    let trimmed = host.trim_end_matches('.');
    let trimmed = trimmed.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(trimmed);
    trimmed.to_ascii_lowercase()
}

fn dedupe_ips(ips: &mut Vec<IpAddr>) {
    let mut unique = Vec::with_capacity(ips.len());
    for ip in ips.drain(..) {
        if !unique.contains(&ip) {
            unique.push(ip);
        }
    }
    *ips = unique;
}

fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, NetError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes).map_err(|_| NetError("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len {
        if expected > max_bytes_u64 {
            return Err(NetError("response exceeds size limit".to_string()));
        }
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle.read_to_end(&mut buf).map_err(|_| NetError("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(NetError("response exceeds size limit".to_string()));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use super::normalize_host_label;

    #[test]
    fn normalize_host_label_lowercases_and_trims_trailing_dot() {
        assert_eq!(normalize_host_label("Example.COM."), "example.com");
    }
}
