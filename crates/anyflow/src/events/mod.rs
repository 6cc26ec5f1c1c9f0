//! CLI telemetry sent to the backend `events` endpoint.

use std::time::Duration;

use anyflow_cli_common::cmd::CmdOutput;
use chrono::{NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::json;
use uuid::Uuid;

pub use self::dispatcher::EventDispatcher;

mod dispatcher;

const EVENT_TYPE_PREFIX: &str = "CLI_";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Flags whose value is never reported.
const REDACTED_FLAGS: &[&str] = &["--api-key"];
const REDACTED: &str = "<redacted>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    ProgramStarted,
    ProgramEnded,
    #[strum(serialize = "deployment_script_started_event")]
    DeploymentScriptStarted,
    #[strum(serialize = "deployment_script_ended_event")]
    DeploymentScriptEnded,
}

/// An event before it is stamped with ids and a timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub kind: EventKind,
    pub payload: serde_json::Value,
}

impl EventPayload {
    pub fn program_started(arguments: &[String]) -> Self {
        Self {
            kind: EventKind::ProgramStarted,
            payload: json!({ "arguments": redact_arguments(arguments) }),
        }
    }

    pub fn program_ended(exit_code: i32, execution_time: Duration) -> Self {
        Self {
            kind: EventKind::ProgramEnded,
            payload: json!({
                "exit_code": exit_code,
                "execution_time": execution_time.as_millis() as u64,
            }),
        }
    }

    pub fn deployment_script_started(chain_deployment_id: u64, command: &str) -> Self {
        Self {
            kind: EventKind::DeploymentScriptStarted,
            payload: json!({
                "command": command,
                "chain_deployment_id": chain_deployment_id,
            }),
        }
    }

    pub fn deployment_script_ended(
        chain_deployment_id: u64,
        output: &CmdOutput,
        execution_time: Duration,
    ) -> Self {
        Self {
            kind: EventKind::DeploymentScriptEnded,
            payload: json!({
                "chain_deployment_id": chain_deployment_id,
                "exitCode": output.exit_code,
                "stdout": output.stdout,
                "stderr": output.stderr,
                "executionTime": execution_time.as_millis() as u64,
            }),
        }
    }
}

/// Event as submitted to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub event_id: Uuid,
    pub session_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    pub cli_version: &'static str,
}

impl Event {
    pub fn new(session_id: Uuid, payload: EventPayload) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            session_id,
            event_type: format!("{EVENT_TYPE_PREFIX}{}", payload.kind),
            payload: payload.payload,
            timestamp: Utc::now().naive_utc(),
            cli_version: env!("CARGO_PKG_VERSION"),
        }
    }
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &NaiveDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
}

fn redact_arguments(arguments: &[String]) -> Vec<String> {
    let mut redacted = Vec::with_capacity(arguments.len());
    let mut hide_next = false;
    for argument in arguments {
        if hide_next {
            redacted.push(REDACTED.to_owned());
            hide_next = false;
            continue;
        }
        match argument.split_once('=') {
            Some((flag, _)) if REDACTED_FLAGS.contains(&flag) => {
                redacted.push(format!("{flag}={REDACTED}"));
            }
            _ => {
                hide_next = REDACTED_FLAGS.contains(&argument.as_str());
                redacted.push(argument.clone());
            }
        }
    }
    redacted
}
