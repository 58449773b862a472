// crates/guardian-cli/src/deploy.rs
// ============================================================================
// Module: Deployment Configuration
// Description: TOML-loadable fleet and collaborator wiring for `guardian
// serve`.
// Purpose: Describe, in one file, which cameras this process monitors and
// which concrete collaborator (HTTP provider or console stand-in, SQLite
// or in-memory store) backs each trait object the runtime depends on.
// Dependencies: guardian-core, guardian-gateway, guardian-planner,
// guardian-store, reqwest, serde, toml
// ============================================================================

//! ## Overview
//! `DeployConfig` is the CLI's own configuration file, separate from
//! [`guardian_core::core::config::RuntimeConfig`] (which only covers
//! scheduler cadence and per-camera defaults). It loads fail-closed the
//! same way: an oversized or malformed file is rejected rather than
//! silently substituting defaults.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use guardian_core::core::camera::Camera;
use guardian_core::core::camera::CameraConfig;
use guardian_core::core::camera::CameraStatus;
use guardian_core::core::camera::NotificationPolicy;
use guardian_core::core::camera::RoomType;
use guardian_core::core::clock::SystemClock;
use guardian_core::core::config::RuntimeConfig;
use guardian_core::core::config::MAX_CONFIG_FILE_SIZE;
use guardian_core::core::identifiers::CameraId;
use guardian_core::interfaces::Datastore;
use guardian_core::interfaces::NotificationGateway;
use guardian_core::interfaces::Planner;
use guardian_core::interfaces::Warehouse;
use guardian_gateway::net::NetConfig;
use guardian_gateway::sms::HttpNotificationGateway;
use guardian_gateway::sms::HttpNotificationGatewayConfig;
use guardian_gateway::warehouse::HttpWarehouse;
use guardian_gateway::warehouse::HttpWarehouseConfig;
use guardian_planner::adapter::PlannerAdapter;
use guardian_planner::fake::FakePlanner;
use guardian_planner::http::HttpPlanner;
use guardian_planner::http::HttpPlannerConfig;
use guardian_core::core::severity::BedState;
use guardian_core::core::severity::Stability;
use guardian_core::interfaces::BedAssessment;
use guardian_core::interfaces::PlannerPlanDraft;
use guardian_core::core::incident::Verdict;
use guardian_store::memory::InMemoryStore;
use guardian_store::sqlite::SqliteStore;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::console::ConsoleGateway;
use crate::console::ConsoleWarehouse;

/// Errors loading a [`DeployConfig`] from disk.
#[derive(Debug, Error)]
pub enum DeployConfigError {
    /// The file could not be read.
    #[error("deploy config io error: {0}")]
    Io(String),
    /// The file exceeds [`MAX_CONFIG_FILE_SIZE`].
    #[error("deploy config file too large: {0} bytes")]
    TooLarge(u64),
    /// The file is not valid TOML for this schema.
    #[error("deploy config parse error: {0}")]
    Parse(String),
    /// An endpoint URL failed to parse.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    /// Opening the configured `SQLite` store failed.
    #[error("sqlite store error: {0}")]
    Store(String),
}

/// One monitored camera's seed configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraSeed {
    /// Externally assigned camera identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Room classification.
    pub room_type: RoomType,
    /// Primary contact string (phone number or equivalent).
    pub primary_contact: String,
    /// Backup contact string.
    pub backup_contact: String,
    /// Voice notifications enabled for this camera.
    #[serde(default = "default_true")]
    pub voice_enabled: bool,
    /// SMS notifications enabled for this camera.
    #[serde(default = "default_true")]
    pub sms_enabled: bool,
}

const fn default_true() -> bool {
    true
}

/// HTTP endpoint configuration for [`guardian_planner::http::HttpPlanner`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerEndpointConfig {
    /// Chat-completion-style endpoint.
    pub endpoint: String,
    /// Bearer token for the endpoint.
    pub api_key: String,
}

/// HTTP endpoint configuration for [`guardian_gateway::sms::HttpNotificationGateway`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayEndpointConfig {
    /// SMS dispatch endpoint.
    pub sms_endpoint: String,
    /// Voice-call dispatch endpoint.
    pub voice_endpoint: String,
    /// Bearer token shared by both endpoints.
    pub api_key: String,
}

/// HTTP endpoint configuration for [`guardian_gateway::warehouse::HttpWarehouse`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarehouseEndpointConfig {
    /// Batch-flush endpoint.
    pub flush_endpoint: String,
    /// Pending-suggestions endpoint.
    pub suggestions_endpoint: String,
    /// Bearer token shared by both endpoints.
    pub api_key: String,
}

/// The CLI's deployment manifest: fleet roster plus collaborator wiring.
///
/// # Invariants
/// - `cameras` is non-empty; `command_serve` rejects an empty roster.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    /// Path to a `SQLite` database file. Absent means in-memory only.
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
    /// Planner HTTP endpoint. Absent means a fixed fake planner.
    #[serde(default)]
    pub planner: Option<PlannerEndpointConfig>,
    /// Notification gateway HTTP endpoints. Absent means console output.
    #[serde(default)]
    pub gateway: Option<GatewayEndpointConfig>,
    /// Warehouse HTTP endpoints. Absent means console output.
    #[serde(default)]
    pub warehouse: Option<WarehouseEndpointConfig>,
    /// The monitored camera fleet.
    pub cameras: Vec<CameraSeed>,
}

impl DeployConfig {
    /// Loads a [`DeployConfig`] from a TOML file, failing closed on an
    /// oversized or malformed file.
    ///
    /// # Errors
    ///
    /// Returns [`DeployConfigError`] when the file cannot be read, exceeds
    /// [`MAX_CONFIG_FILE_SIZE`], or fails to parse against this schema.
    pub fn load(path: &Path) -> Result<Self, DeployConfigError> {
        let metadata = fs::metadata(path).map_err(|err| DeployConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(DeployConfigError::TooLarge(metadata.len()));
        }
        let raw = fs::read_to_string(path).map_err(|err| DeployConfigError::Io(err.to_string()))?;
        toml::from_str(&raw).map_err(|err| DeployConfigError::Parse(err.to_string()))
    }
}

/// Opens the configured datastore, `SQLite` if `sqlite_path` is set,
/// in-memory otherwise.
///
/// # Errors
///
/// Returns [`DeployConfigError`] when the `SQLite` store cannot be opened.
pub fn build_store(config: &DeployConfig) -> Result<Arc<dyn Datastore + Send + Sync>, DeployConfigError> {
    match &config.sqlite_path {
        Some(path) => {
            let store = SqliteStore::open(path).map_err(|err| DeployConfigError::Store(err.to_string()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

/// Builds the configured planner, an [`HttpPlanner`] if `planner` is set,
/// a fixed [`FakePlanner`] otherwise.
///
/// # Errors
///
/// Returns [`DeployConfigError`] when the endpoint URL fails to parse.
pub fn build_planner(config: &DeployConfig) -> Result<Arc<dyn Planner + Send + Sync>, DeployConfigError> {
    match &config.planner {
        Some(endpoint) => {
            let url = Url::parse(&endpoint.endpoint).map_err(|err| DeployConfigError::InvalidUrl(err.to_string()))?;
            let http_config = HttpPlannerConfig::new(url, endpoint.api_key.clone());
            Ok(Arc::new(HttpPlanner::new(http_config)))
        }
        None => Ok(Arc::new(FakePlanner::new(fallback_draft(), fallback_bed_assessment()))),
    }
}

fn fallback_draft() -> PlannerPlanDraft {
    PlannerPlanDraft {
        verdict: Verdict::PossibleFall,
        severity_seed: 3,
        confidence: 0.5,
        reasons: vec!["no planner endpoint configured; using fixed demo response".to_string()],
        actions: vec![],
        replan_interval_s: 30.0,
    }
}

const fn fallback_bed_assessment() -> BedAssessment {
    BedAssessment { bed_state: BedState::Unknown, stability: Stability::Unknown }
}

/// Builds the configured notification gateway, an [`HttpNotificationGateway`]
/// if `gateway` is set, a [`ConsoleGateway`] otherwise.
///
/// # Errors
///
/// Returns [`DeployConfigError`] when an endpoint URL fails to parse.
pub fn build_gateway(config: &DeployConfig) -> Result<Arc<dyn NotificationGateway + Send + Sync>, DeployConfigError> {
    match &config.gateway {
        Some(endpoint) => {
            let sms_endpoint = Url::parse(&endpoint.sms_endpoint).map_err(|err| DeployConfigError::InvalidUrl(err.to_string()))?;
            let voice_endpoint = Url::parse(&endpoint.voice_endpoint).map_err(|err| DeployConfigError::InvalidUrl(err.to_string()))?;
            let http_config = HttpNotificationGatewayConfig {
                sms_endpoint,
                voice_endpoint,
                api_key: endpoint.api_key.clone(),
                net: NetConfig::default(),
            };
            Ok(Arc::new(HttpNotificationGateway::new(http_config)))
        }
        None => Ok(Arc::new(ConsoleGateway)),
    }
}

/// Builds the configured warehouse, an [`HttpWarehouse`] if `warehouse`
/// is set, a [`ConsoleWarehouse`] otherwise.
///
/// # Errors
///
/// Returns [`DeployConfigError`] when an endpoint URL fails to parse.
pub fn build_warehouse(config: &DeployConfig) -> Result<Arc<dyn Warehouse + Send + Sync>, DeployConfigError> {
    match &config.warehouse {
        Some(endpoint) => {
            let flush_endpoint = Url::parse(&endpoint.flush_endpoint).map_err(|err| DeployConfigError::InvalidUrl(err.to_string()))?;
            let suggestions_endpoint =
                Url::parse(&endpoint.suggestions_endpoint).map_err(|err| DeployConfigError::InvalidUrl(err.to_string()))?;
            let http_config = HttpWarehouseConfig {
                flush_endpoint,
                suggestions_endpoint,
                api_key: endpoint.api_key.clone(),
                net: NetConfig::default(),
            };
            Ok(Arc::new(HttpWarehouse::new(http_config)))
        }
        None => Ok(Arc::new(ConsoleWarehouse)),
    }
}

/// Seeds every camera in the roster into `store`, using `runtime`'s
/// per-camera defaults for the recognized config mapping and any field
/// the seed does not override.
///
/// # Errors
///
/// Returns an error string when persisting a camera fails.
pub fn seed_cameras(store: &(dyn Datastore + Send + Sync), config: &DeployConfig, runtime: &RuntimeConfig) -> Result<(), String> {
    for seed in &config.cameras {
        let camera = Camera {
            id: CameraId::new(seed.id.clone()),
            name: seed.name.clone(),
            room_type: seed.room_type,
            bed_polygon: None,
            primary_contact: seed.primary_contact.clone(),
            backup_contact: seed.backup_contact.clone(),
            voice_enabled: seed.voice_enabled,
            sms_enabled: seed.sms_enabled,
            risk_score: 0.0,
            last_seen: None,
            config: CameraConfig { ..runtime.default_camera_config },
            status: CameraStatus::Active,
            policy: NotificationPolicy {
                sms_enabled: seed.sms_enabled,
                voice_enabled: seed.voice_enabled,
                ..runtime.default_notification_policy
            },
        };
        store.put_camera(&camera).map_err(|err| err.to_string())?;
    }
    Ok(())
}

/// Builds a fresh [`PlannerAdapter`] wrapping `planner`.
#[must_use]
pub fn build_planner_adapter(planner: &Arc<dyn Planner + Send + Sync>) -> Arc<PlannerAdapter> {
    Arc::new(PlannerAdapter::new(Arc::clone(planner)))
}

/// The system clock, used by every collaborator unless a test overrides it.
#[must_use]
pub fn system_clock() -> Arc<SystemClock> {
    Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use guardian_core::core::config::RuntimeConfig;
    use guardian_core::interfaces::Datastore;

    use super::DeployConfig;
    use super::DeployConfigError;

    const MINIMAL: &str = r#"
        [[cameras]]
        id = "cam-1"
        name = "Bedroom"
        room_type = "bedroom"
        primary_contact = "+15551230000"
        backup_contact = "+15551230001"
    "#;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("deploy.toml");
        std::fs::write(&path, body).expect("write config fixture");
        path
    }

    #[test]
    fn load_minimal_config_applies_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, MINIMAL);

        let config = DeployConfig::load(&path).expect("load minimal config");

        assert_eq!(config.cameras.len(), 1);
        assert!(config.sqlite_path.is_none());
        assert!(config.planner.is_none());
        assert!(config.gateway.is_none());
        assert!(config.warehouse.is_none());
        assert!(config.cameras[0].voice_enabled);
        assert!(config.cameras[0].sms_enabled);
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let body = format!("{MINIMAL}\nbogus_field = true\n");
        let path = write_config(&dir, &body);

        let err = DeployConfig::load(&path).expect_err("unknown field must be rejected");
        assert!(matches!(err, DeployConfigError::Parse(_)));
    }

    #[test]
    fn load_rejects_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("does-not-exist.toml");

        let err = DeployConfig::load(&missing).expect_err("missing file must be rejected");
        assert!(matches!(err, DeployConfigError::Io(_)));
    }

    #[test]
    fn load_rejects_oversized_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("huge.toml");
        let padding = "# ".to_string() + &"x".repeat(2 * 1024 * 1024);
        std::fs::write(&path, padding).expect("write oversized fixture");

        let err = DeployConfig::load(&path).expect_err("oversized file must be rejected");
        assert!(matches!(err, DeployConfigError::TooLarge(_)));
    }

    #[test]
    fn build_store_defaults_to_in_memory_and_seeds_cameras() {
        use guardian_core::core::identifiers::CameraId;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, MINIMAL);
        let config = DeployConfig::load(&path).expect("load minimal config");
        let runtime = RuntimeConfig::default();

        let store = super::build_store(&config).expect("build in-memory store");
        super::seed_cameras(store.as_ref(), &config, &runtime).expect("seed cameras");

        let camera_id = CameraId::new(config.cameras[0].id.clone());
        let camera = store.get_camera(&camera_id).expect("query camera");
        assert!(camera.is_some());
    }

    #[test]
    fn build_planner_without_endpoint_uses_fake_planner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_config(&dir, MINIMAL);
        let config = DeployConfig::load(&path).expect("load minimal config");

        assert!(super::build_planner(&config).is_ok());
    }

    #[test]
    fn build_planner_with_invalid_url_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let body = format!("{MINIMAL}\n[planner]\nendpoint = \"not a url\"\napi_key = \"secret\"\n");
        let path = write_config(&dir, &body);
        let config = DeployConfig::load(&path).expect("load config with planner endpoint");

        let err = super::build_planner(&config).expect_err("invalid url must be rejected");
        assert!(matches!(err, DeployConfigError::InvalidUrl(_)));
    }
}
