// crates/guardian-cli/src/ingest.rs
// ============================================================================
// Module: Stdin Vision Ingestion
// Description: A `VisionTrigger` reading newline-delimited JSON
// observations from a buffered reader, plus the task pair that drains
// it into a `TriggerRouter`.
// Purpose: Give the demo/ops binary a vision pipeline stand-in without
// depending on a real camera fleet or model server.
// Dependencies: guardian-core, guardian-runtime, serde_json, tokio
// ============================================================================

//! ## Overview
//! Each line read is one JSON-encoded `VisionObservation`. Blank lines
//! are skipped; a line that fails to parse is reported on stderr and
//! skipped rather than treated as end of input. [`VisionLineReader`] is
//! generic over its source so it can be driven by stdin in production
//! and by an in-memory buffer in tests. `spawn_ingest` wires a blocking
//! reader thread to an async dispatcher task over a bounded channel,
//! since `VisionTrigger::next_observation` is a synchronous,
//! blocking-read API.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Lines;
use std::io::Stdin;
use std::sync::Arc;

use guardian_core::interfaces::VisionObservation;
use guardian_core::interfaces::VisionTrigger;
use guardian_runtime::trigger::TriggerRouter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::output::write_stderr_line;

/// A [`VisionTrigger`] reading one JSON [`VisionObservation`] per
/// non-blank line from `R`.
pub struct VisionLineReader<R> {
    lines: Lines<R>,
}

impl<R: BufRead> VisionLineReader<R> {
    /// Wraps a buffered reader as a vision trigger source.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self { lines: reader.lines() }
    }
}

impl<R: BufRead> VisionTrigger for VisionLineReader<R> {
    fn next_observation(&mut self) -> Option<VisionObservation> {
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(_)) | None => return None,
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(observation) => return Some(observation),
                Err(err) => {
                    let _ = write_stderr_line(&format!("skipping invalid observation: {err}"));
                }
            }
        }
    }
}

/// A [`VisionTrigger`] reading from the process's stdin.
pub type StdinVisionTrigger = VisionLineReader<BufReader<Stdin>>;

/// Creates a trigger reading from the process's stdin.
#[must_use]
pub fn stdin_trigger() -> StdinVisionTrigger {
    VisionLineReader::new(BufReader::new(std::io::stdin()))
}

/// Spawns the blocking stdin reader and the async dispatcher that feeds
/// each observation into `router`. Returns both task handles so the
/// caller can await the reader closing (stdin EOF) before shutting the
/// rest of the process down.
pub fn spawn_ingest(router: Arc<TriggerRouter>) -> (JoinHandle<()>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<VisionObservation>(64);

    let reader = tokio::task::spawn_blocking(move || {
        let mut trigger = stdin_trigger();
        while let Some(observation) = trigger.next_observation() {
            if tx.blocking_send(observation).is_err() {
                break;
            }
        }
    });

    let dispatcher = tokio::spawn(async move {
        while let Some(observation) = rx.recv().await {
            if let Err(err) = router.handle_observation(observation).await {
                let _ = write_stderr_line(&format!("failed to handle observation: {err}"));
            }
        }
    });

    (reader, dispatcher)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests use unwrap/expect on deterministic fixtures.")]
    use std::io::Cursor;

    use guardian_core::interfaces::VisionTrigger;

    use super::VisionLineReader;

    const GOOD: &str = r#"{"camera_id":"cam-1","motion":0.1,"stillness":0.9,"frame":null,"trigger":null}"#;

    fn trigger_over(input: &str) -> VisionLineReader<Cursor<Vec<u8>>> {
        VisionLineReader::new(Cursor::new(input.to_string().into_bytes()))
    }

    #[test]
    fn skips_blank_lines_and_parses_observation() {
        let mut trigger = trigger_over(&format!("\n   \n{GOOD}\n"));
        let observation = trigger.next_observation();
        assert!(observation.is_some(), "expected one observation from well-formed line");
    }

    #[test]
    fn skips_malformed_lines_without_stopping() {
        let mut trigger = trigger_over(&format!("not json\n{GOOD}\n"));
        let observation = trigger.next_observation();
        assert!(observation.is_some(), "malformed line must be skipped, not treated as EOF");
    }

    #[test]
    fn returns_none_at_eof() {
        let mut trigger = trigger_over("");
        assert!(trigger.next_observation().is_none());
    }

    #[test]
    fn reads_multiple_observations_in_order() {
        let mut trigger = trigger_over(&format!("{GOOD}\n{GOOD}\n"));
        assert!(trigger.next_observation().is_some());
        assert!(trigger.next_observation().is_some());
        assert!(trigger.next_observation().is_none());
    }
}
