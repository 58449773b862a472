// crates/guardian-runtime/src/executor.rs
// ============================================================================
// Module: Action Executor
// Description: Sequential dispatch of an approved action list.
// Purpose: Turn a Guard-approved `Vec<PlanAction>` into gateway calls,
// ActionLog records, and timeline events, per spec.md §4.4's side-effect
// mapping table.
// Dependencies: guardian-core, tokio
// ============================================================================

//! ## Overview
//! `ActionExecutor::execute` iterates the approved action list in
//! order, sleeping `delay_s` before each dispatch. A single action's
//! gateway failure is recorded in its `ActionLog.result` string and
//! never aborts the remaining actions in the list (spec.md §4.4).
//! `CLOSE_INCIDENT` and `INCREASE_CHECK_RATE` mutate controller-owned
//! state instead of calling the gateway; the executor surfaces those
//! as fields on [`ExecutionOutcome`] for the controller to apply.

use std::sync::Arc;

use guardian_core::core::clock::Clock;
use guardian_core::core::identifiers::ActionLogId;
use guardian_core::core::identifiers::CameraId;
use guardian_core::core::identifiers::IncidentId;
use guardian_core::core::incident::ActionLog;
use guardian_core::core::incident::ActionType;
use guardian_core::core::incident::Incident;
use guardian_core::core::incident::IncidentStatus;
use guardian_core::core::incident::PlanAction;
use guardian_core::core::timeline::EventKind;
use guardian_core::interfaces::Datastore;
use guardian_core::interfaces::NotificationGateway;
use guardian_core::interfaces::StoreError;
use thiserror::Error;

use crate::timeline::TimelineLogger;

const HEADSUP_TEMPLATE: &str = "Heads up: elevated fall risk detected. No action needed unless it recurs.";

/// Errors surfaced by the executor itself, as opposed to per-action
/// gateway failures (which are recorded in [`ActionLog::result`]
/// instead of aborting the run).
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Persisting the mutated incident or an action log failed.
    #[error("executor store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of running [`ActionExecutor::execute`] over one approved
/// action list.
#[derive(Debug)]
pub struct ExecutionOutcome {
    /// One log entry per dispatched action, in dispatch order.
    pub logs: Vec<ActionLog>,
    /// The incident, possibly mutated by `CLOSE_INCIDENT`.
    pub incident: Incident,
    /// Set by `INCREASE_CHECK_RATE`; the controller applies it to its
    /// own replan cadence.
    pub requested_replan_interval_s: Option<f64>,
    /// Set by `REQUEST_STRONG_VERIFY`; the controller spawns the
    /// one-shot strong-verify task.
    pub strong_verify_requested: bool,
}

/// Sequential dispatcher for Guard-approved plan actions.
pub struct ActionExecutor {
    gateway: Arc<dyn NotificationGateway + Send + Sync>,
    store: Arc<dyn Datastore + Send + Sync>,
    timeline: Arc<TimelineLogger>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl ActionExecutor {
    /// Creates an executor dispatching through `gateway`, persisting
    /// through `store`, and logging through `timeline`.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn NotificationGateway + Send + Sync>,
        store: Arc<dyn Datastore + Send + Sync>,
        timeline: Arc<TimelineLogger>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self { gateway, store, timeline, clock }
    }

    /// Executes `actions` against `incident` in order, per spec.md
    /// §4.4.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError`] only when persisting the incident or
    /// an action log fails; individual gateway failures are recorded
    /// in `ActionLog.result` and do not abort the loop.
    pub async fn execute(&self, mut incident: Incident, actions: Vec<PlanAction>, primary: &str, backup: &str) -> Result<ExecutionOutcome, ExecutorError> {
        let mut logs = Vec::with_capacity(actions.len());
        let mut requested_replan_interval_s = None;
        let mut strong_verify_requested = false;

        for action in actions {
            if action.delay_s > 0.0 {
                tokio::time::sleep(std::time::Duration::from_secs_f64(action.delay_s)).await;
            }

            let result = match action.action {
                ActionType::SendSmsPrimary => self.dispatch_sms(primary, &incident.summary_text).await,
                ActionType::SendLowPriorityHeadsup => self.dispatch_sms(primary, HEADSUP_TEMPLATE).await,
                ActionType::StartVoiceCallPrimary => self.dispatch_call(primary, incident.id).await,
                ActionType::EscalateToBackup => {
                    let sms = self.dispatch_sms(backup, &incident.summary_text).await;
                    let call = self.dispatch_call(backup, incident.id).await;
                    format!("sms={sms}; call={call}")
                }
                ActionType::CloseIncident => {
                    incident.status = IncidentStatus::Closed;
                    self.store.put_incident(&incident)?;
                    "closed".to_string()
                }
                ActionType::IncreaseCheckRate => {
                    let interval_s = action.params.get("interval_s").and_then(serde_json::Value::as_f64).unwrap_or(10.0);
                    requested_replan_interval_s = Some(interval_s.max(1.0));
                    format!("interval_s={interval_s}")
                }
                ActionType::CancelEscalation => "no-op".to_string(),
                ActionType::RequestStrongVerify => {
                    strong_verify_requested = true;
                    "requested".to_string()
                }
            };

            let log = ActionLog {
                id: ActionLogId::generate(),
                incident_id: incident.id,
                camera_id: incident.camera_id.clone(),
                action_type: action.action,
                params: action.params.clone(),
                result,
                ts: self.clock.now(),
            };
            self.store.put_action_log(&log)?;
            self.log_action_executed(incident.id, incident.camera_id.clone(), &log);
            logs.push(log);
        }

        Ok(ExecutionOutcome {
            logs,
            incident,
            requested_replan_interval_s,
            strong_verify_requested,
        })
    }

    async fn dispatch_sms(&self, to: &str, body_override: &str) -> String {
        let to = to.to_string();
        let body = body_override.to_string();
        let gateway = Arc::clone(&self.gateway);
        let outcome = tokio::task::spawn_blocking(move || gateway.send_sms(&to, &body)).await;
        match outcome {
            Ok(Ok(external_id)) => external_id,
            Ok(Err(err)) => err.to_string(),
            Err(join_err) => join_err.to_string(),
        }
    }

    async fn dispatch_call(&self, to: &str, incident_id: IncidentId) -> String {
        let to = to.to_string();
        let gateway = Arc::clone(&self.gateway);
        let outcome = tokio::task::spawn_blocking(move || gateway.start_voice_call(&to, &incident_id)).await;
        match outcome {
            Ok(Ok(external_id)) => external_id,
            Ok(Err(err)) => err.to_string(),
            Err(join_err) => join_err.to_string(),
        }
    }

    fn log_action_executed(&self, incident_id: IncidentId, camera_id: CameraId, log: &ActionLog) {
        let mut payload = serde_json::Map::new();
        payload.insert("action_type".to_string(), serde_json::json!(log.action_type));
        payload.insert("result".to_string(), serde_json::json!(log.result));
        let _ = self.timeline.log_event(incident_id, camera_id, EventKind::ActionExecuted, payload);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use std::sync::Arc;

    use guardian_core::core::clock::FixedClock;
    use guardian_core::core::identifiers::CameraId;
    use guardian_core::core::identifiers::IncidentId;
    use guardian_core::core::incident::Incident;
    use guardian_core::core::incident::IncidentStatus;
    use guardian_core::core::incident::PlanAction;
    use guardian_core::core::incident::Verdict;
    use guardian_core::interfaces::GatewayError;
    use guardian_core::interfaces::NotificationGateway;
    use guardian_store::memory::InMemoryStore;
    use time::macros::datetime;

    use super::ActionExecutor;
    use super::ActionType;
    use crate::broadcast::TimelineHub;
    use crate::timeline::TimelineLogger;

    struct FlakyGateway {
        fail_sms: bool,
    }

    impl NotificationGateway for FlakyGateway {
        fn send_sms(&self, _to: &str, _body: &str) -> Result<String, GatewayError> {
            if self.fail_sms {
                Err(GatewayError::DeliveryFailed("down".to_string()))
            } else {
                Ok("sms-1".to_string())
            }
        }

        fn start_voice_call(&self, _to: &str, _incident_id: &IncidentId) -> Result<String, GatewayError> {
            Ok("call-1".to_string())
        }
    }

    fn incident() -> Incident {
        Incident {
            id: IncidentId::generate(),
            camera_id: CameraId::new("cam-1"),
            created_at: datetime!(2026-01-01 00:00:00 UTC),
            status: IncidentStatus::Active,
            verdict: Verdict::ConfirmedFall,
            severity_seed: 4,
            severity_current: 4,
            risk_score: 0.9,
            confidence: 0.8,
            time_down_s: 0.0,
            acknowledged: false,
            ack_by: None,
            escalation_stage: 0,
            plan_version: 1,
            reasons_current: vec!["fall detected".to_string()],
            language: "en".to_string(),
            summary_text: String::new(),
            frames_b64: Vec::new(),
        }
    }

    fn executor(gateway: Arc<dyn NotificationGateway + Send + Sync>) -> ActionExecutor {
        let store = Arc::new(InMemoryStore::new());
        let hub = Arc::new(TimelineHub::new());
        let clock = Arc::new(FixedClock::new(datetime!(2026-01-01 00:00:00 UTC)));
        let timeline = Arc::new(TimelineLogger::new(store.clone(), hub, clock.clone(), 100));
        ActionExecutor::new(gateway, store, timeline, clock)
    }

    #[tokio::test]
    async fn sms_failure_does_not_abort_remaining_actions() {
        let gateway = Arc::new(FlakyGateway { fail_sms: true });
        let exec = executor(gateway);
        let actions = vec![
            PlanAction::immediate(ActionType::SendSmsPrimary),
            PlanAction::immediate(ActionType::CloseIncident),
        ];
        let outcome = exec.execute(incident(), actions, "+15551234567", "+15559876543").await.expect("execute");
        assert_eq!(outcome.logs.len(), 2);
        assert!(outcome.logs[0].result.contains("delivery failed"));
        assert_eq!(outcome.incident.status, IncidentStatus::Closed);
    }

    #[tokio::test]
    async fn increase_check_rate_surfaces_requested_interval() {
        let gateway = Arc::new(FlakyGateway { fail_sms: false });
        let exec = executor(gateway);
        let mut params = serde_json::Map::new();
        params.insert("interval_s".to_string(), serde_json::json!(15.0));
        let action = PlanAction {
            action: ActionType::IncreaseCheckRate,
            delay_s: 0.0,
            params,
        };
        let outcome = exec.execute(incident(), vec![action], "+1", "+2").await.expect("execute");
        assert_eq!(outcome.requested_replan_interval_s, Some(15.0));
    }

    #[tokio::test]
    async fn escalate_to_backup_dispatches_sms_and_call() {
        let gateway = Arc::new(FlakyGateway { fail_sms: false });
        let exec = executor(gateway);
        let action = PlanAction::immediate(ActionType::EscalateToBackup);
        let outcome = exec.execute(incident(), vec![action], "+1", "+2").await.expect("execute");
        assert!(outcome.logs[0].result.contains("sms=sms-1"));
        assert!(outcome.logs[0].result.contains("call=call-1"));
    }

    #[tokio::test]
    async fn request_strong_verify_sets_flag() {
        let gateway = Arc::new(FlakyGateway { fail_sms: false });
        let exec = executor(gateway);
        let action = PlanAction::immediate(ActionType::RequestStrongVerify);
        let outcome = exec.execute(incident(), vec![action], "+1", "+2").await.expect("execute");
        assert!(outcome.strong_verify_requested);
    }
}
