// crates/guardian-cli/src/main.rs
// ============================================================================
// Module: Guardian CLI Entry Point
// Description: Command dispatcher wiring the runtime control loop to a
// configured camera fleet and collaborator set.
// Purpose: Provide the ops/demo binary that turns stdin-fed vision
// observations into dispatched actions and a live timeline tail.
// Dependencies: clap, guardian-core, guardian-gateway, guardian-planner,
// guardian-runtime, guardian-store, serde_json, tokio.
// ============================================================================

//! ## Overview
//! `guardian serve` loads a [`deploy::DeployConfig`] (fleet roster and
//! collaborator endpoints) and an optional
//! [`guardian_core::core::config::RuntimeConfig`] (scheduler cadence and
//! per-camera defaults), wires the full control loop
//! (`TriggerRouter` + `Scheduler`), tails live timeline events to stdout,
//! and feeds it newline-delimited JSON `VisionObservation`s read from
//! stdin until EOF.

mod console;
mod deploy;
mod ingest;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use guardian_core::core::config::ConfigError;
use guardian_core::core::config::RuntimeConfig;
use guardian_core::runtime::guard::SafetyGuard;
use guardian_runtime::broadcast::TimelineHub;
use guardian_runtime::executor::ActionExecutor;
use guardian_runtime::registry::IncidentControllers;
use guardian_runtime::scheduler::Scheduler;
use guardian_runtime::timeline::TimelineLogger;
use guardian_runtime::trigger::TriggerRouter;
use thiserror::Error;

use crate::deploy::DeployConfig;
use crate::deploy::DeployConfigError;
use crate::output::write_stderr_line;
use crate::output::write_stdout_line;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "guardian", arg_required_else_help = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the incident-response control loop against a configured fleet.
    Serve(ServeCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Path to the deployment manifest (fleet roster and collaborator
    /// endpoints).
    #[arg(long, value_name = "PATH")]
    deploy_config: PathBuf,
    /// Optional scheduler-cadence/per-camera-defaults config file.
    #[arg(long, value_name = "PATH")]
    runtime_config: Option<PathBuf>,
}

/// CLI error wrapper.
#[derive(Debug, Error)]
enum CliError {
    /// Loading the runtime config failed.
    #[error("failed to load runtime config: {0}")]
    RuntimeConfig(#[from] ConfigError),
    /// Loading or applying the deploy config failed.
    #[error("failed to load deploy config: {0}")]
    DeployConfig(#[from] DeployConfigError),
    /// No cameras are configured to monitor.
    #[error("deploy config lists no cameras")]
    NoCameras,
    /// Seeding the camera fleet into the store failed.
    #[error("failed to seed camera fleet: {0}")]
    SeedCameras(String),
    /// Writing to stdout/stderr failed.
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

type CliResult<T> = Result<T, CliError>;

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => match command_serve(command).await {
            Ok(code) => code,
            Err(err) => {
                let _ = write_stderr_line(&err.to_string());
                ExitCode::FAILURE
            }
        },
    }
}

/// Executes the `serve` command: wires collaborators, seeds the fleet,
/// tails the timeline, and drains stdin observations until EOF.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let runtime_config = match command.runtime_config {
        Some(path) => RuntimeConfig::load(&path)?,
        None => RuntimeConfig::default(),
    };
    let deploy_config = DeployConfig::load(&command.deploy_config)?;
    if deploy_config.cameras.is_empty() {
        return Err(CliError::NoCameras);
    }

    let store = deploy::build_store(&deploy_config)?;
    let planner = deploy::build_planner(&deploy_config)?;
    let gateway = deploy::build_gateway(&deploy_config)?;
    let warehouse = deploy::build_warehouse(&deploy_config)?;
    let clock = deploy::system_clock();

    deploy::seed_cameras(store.as_ref(), &deploy_config, &runtime_config).map_err(CliError::SeedCameras)?;

    let hub = Arc::new(TimelineHub::new());
    let timeline = Arc::new(TimelineLogger::new(store.clone(), hub.clone(), clock.clone(), runtime_config.timeline_buffer_capacity));
    let guard = Arc::new(SafetyGuard::new());
    let executor = Arc::new(ActionExecutor::new(gateway.clone(), store.clone(), timeline.clone(), clock.clone()));
    let planner_adapter = deploy::build_planner_adapter(&planner);
    let registry = Arc::new(IncidentControllers::new());

    let router = Arc::new(TriggerRouter::new(
        store.clone(),
        gateway,
        planner_adapter,
        planner,
        guard,
        executor,
        registry,
        timeline.clone(),
        clock,
    ));

    let scheduler = Scheduler::spawn(&runtime_config, store, warehouse, timeline);
    let tail = spawn_timeline_tail(hub);
    let (reader, dispatcher) = ingest::spawn_ingest(router);

    let _ = reader.await;
    dispatcher.abort();
    tail.abort();
    scheduler.shutdown();

    write_stdout_line("stdin closed; shutting down")?;
    Ok(ExitCode::SUCCESS)
}

/// Subscribes to the timeline hub and prints each event as one JSON
/// line on stdout.
fn spawn_timeline_tail(hub: Arc<TimelineHub>) -> tokio::task::JoinHandle<()> {
    let mut receiver = hub.subscribe();
    tokio::spawn(async move {
        while let Some(event_json) = receiver.recv().await {
            let _ = write_stdout_line(&event_json);
        }
    })
}
