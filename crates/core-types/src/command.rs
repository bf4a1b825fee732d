use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque identifier assigned by the relay on enqueue.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub String);

impl CommandId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CommandId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Delivered,
}

/// A unit of work queued by a controller for the agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    #[serde(rename = "command")]
    pub kind: String,
    #[serde(rename = "data", default = "empty_object")]
    pub payload: Value,
    #[serde(rename = "timestamp")]
    pub enqueued_at: DateTime<Utc>,
    pub status: CommandStatus,
}

impl Command {
    pub fn new(id: CommandId, kind: impl Into<String>, payload: Value) -> Self {
        Self {
            id,
            kind: kind.into(),
            payload: normalize_payload(payload),
            enqueued_at: Utc::now(),
            status: CommandStatus::Pending,
        }
    }

    /// Look up a string parameter in the payload; blank strings count as missing.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.payload
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Numeric parameter, accepting both JSON numbers and numeric strings.
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        match self.payload.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(raw) => raw.trim().parse().ok(),
            _ => None,
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn normalize_payload(payload: Value) -> Value {
    match payload {
        Value::Null => empty_object(),
        other => other,
    }
}

/// Outcome the agent reports for one command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultReport {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResultReport {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A recorded result, correlated to its command by id only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub command_id: CommandId,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub completed_at: DateTime<Utc>,
}

impl CommandResult {
    pub fn from_report(command_id: CommandId, report: ResultReport) -> Self {
        Self {
            command_id,
            success: report.success,
            message: report.message,
            data: report.data,
            completed_at: Utc::now(),
        }
    }
}
