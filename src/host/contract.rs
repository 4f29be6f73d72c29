//! Versioned command/event envelopes exchanged with a host shell.

use serde::{Deserialize, Serialize};

/// Contract version for command/response/event envelopes.
pub const CONTRACT_VERSION: u32 = 1;

/// Commands accepted by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "task.add")]
    TaskAdd,
    #[serde(rename = "task.update")]
    TaskUpdate,
    #[serde(rename = "task.delete")]
    TaskDelete,
    #[serde(rename = "task.toggle")]
    TaskToggle,
    #[serde(rename = "day.select")]
    DaySelect,
    #[serde(rename = "views.get")]
    ViewsGet,
    #[serde(rename = "runtime.stop")]
    RuntimeStop,
}

impl CommandName {
    /// Wire name, e.g. `"task.add"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskAdd => "task.add",
            Self::TaskUpdate => "task.update",
            Self::TaskDelete => "task.delete",
            Self::TaskToggle => "task.toggle",
            Self::DaySelect => "day.select",
            Self::ViewsGet => "views.get",
            Self::RuntimeStop => "runtime.stop",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "task.add" => Some(Self::TaskAdd),
            "task.update" => Some(Self::TaskUpdate),
            "task.delete" => Some(Self::TaskDelete),
            "task.toggle" => Some(Self::TaskToggle),
            "day.select" => Some(Self::DaySelect),
            "views.get" => Some(Self::ViewsGet),
            "runtime.stop" => Some(Self::RuntimeStop),
            _ => None,
        }
    }
}

/// Event names emitted by the bridge.
pub mod events {
    pub const VIEWS_UPDATED: &str = "views.updated";
    pub const REMINDER_DEGRADED: &str = "reminder.degraded";
    pub const REMINDER_FIRED: &str = "reminder.fired";
}

/// Host -> core command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: CONTRACT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Check the envelope version and request id.
    ///
    /// # Errors
    ///
    /// Returns a [`ContractError`] for an unknown version or a blank id.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != CONTRACT_VERSION {
            return Err(ContractError::UnsupportedVersion {
                got: self.v,
                expected: CONTRACT_VERSION,
            });
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::InvalidEnvelope(
                "request_id cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Core -> host reply to one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: CONTRACT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: CONTRACT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// Core -> host unsolicited notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build an event with a fresh random id.
    #[must_use]
    pub fn new(event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: CONTRACT_VERSION,
            event_id: uuid::Uuid::new_v4().to_string(),
            event: event.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("unsupported contract version {got}; expected {expected}")]
    UnsupportedVersion { got: u32, expected: u32 },

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
}
