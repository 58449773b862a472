// crates/guardian-cli/src/console.rs
// ============================================================================
// Module: Console Collaborators
// Description: Stdout-printing NotificationGateway/Warehouse stand-ins.
// Purpose: Let `guardian serve` run end to end with no external HTTP
// collaborator configured, in place of a real notification provider or
// analytics warehouse.
// Dependencies: guardian-core
// ============================================================================

//! ## Overview
//! [`ConsoleGateway`] and [`ConsoleWarehouse`] never fail and never leave
//! the process: every call is rendered as one line on stdout instead of
//! dispatched over the network. They exist so the demo harness can run
//! without a deployed SMS/voice provider or warehouse endpoint.

use guardian_core::core::identifiers::IncidentId;
use guardian_core::core::timeline::ConfigUpdate;
use guardian_core::core::timeline::TimelineEvent;
use guardian_core::interfaces::GatewayError;
use guardian_core::interfaces::NotificationGateway;
use guardian_core::interfaces::Warehouse;
use guardian_core::interfaces::WarehouseError;

use crate::output::write_stdout_line;

/// A [`NotificationGateway`] that prints dispatch requests to stdout
/// instead of calling a real provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleGateway;

impl NotificationGateway for ConsoleGateway {
    fn send_sms(&self, to: &str, body: &str) -> Result<String, GatewayError> {
        let _ = write_stdout_line(&format!("[sms] to={to} body={body:?}"));
        Ok(format!("console-sms-{to}"))
    }

    fn start_voice_call(&self, to: &str, incident_id: &IncidentId) -> Result<String, GatewayError> {
        let _ = write_stdout_line(&format!("[voice] to={to} incident={incident_id}"));
        Ok(format!("console-call-{to}"))
    }
}

/// A [`Warehouse`] that prints flushed batches to stdout and never
/// returns a config suggestion, instead of calling a real analytics
/// endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleWarehouse;

impl Warehouse for ConsoleWarehouse {
    fn flush(&self, events: &[TimelineEvent]) -> Result<(), WarehouseError> {
        let _ = write_stdout_line(&format!("[warehouse] flushed {} event(s)", events.len()));
        Ok(())
    }

    fn read_config_suggestions(&self) -> Result<Vec<ConfigUpdate>, WarehouseError> {
        Ok(Vec::new())
    }
}
