// crates/guardian-gateway/tests/channel_policy.rs
// ============================================================================
// Integration test: the SMS gateway fails closed on a non-https endpoint.
// ============================================================================

use guardian_gateway::net::NetConfig;
use guardian_gateway::sms::HttpNotificationGateway;
use guardian_gateway::sms::HttpNotificationGatewayConfig;
use guardian_core::interfaces::NotificationGateway;
use reqwest::Url;

#[test]
fn send_sms_rejects_cleartext_endpoint() {
    let config = HttpNotificationGatewayConfig {
        sms_endpoint: Url::parse("http://example.com/sms").expect("valid url"),
        voice_endpoint: Url::parse("https://example.com/voice").expect("valid url"),
        api_key: "test-key".to_string(),
        net: NetConfig::default(),
    };
    let gateway = HttpNotificationGateway::new(config);
    let result = gateway.send_sms("+15551234567", "test message");
    assert!(result.is_err());
}
