// Audit event types and structures
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Application name recorded on every responder event.
pub const APPLICATION_NAME: &str = "ocsp";
/// Event name for server start.
pub const EVENT_START: &str = "START";
/// Event name for server shutdown.
pub const EVENT_SHUTDOWN: &str = "SHUTDOWN";

// Well-known data keys
pub const KEY_MESSAGE_ID: &str = "mid";
pub const KEY_SERIAL: &str = "serial";
pub const KEY_TYPE: &str = "type";
pub const KEY_STATUS: &str = "status";
pub const KEY_MESSAGE: &str = "message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Successful,
    Failed,
    Undetermined,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AuditStatus::Successful => "successful",
            AuditStatus::Failed => "failed",
            AuditStatus::Undetermined => "undetermined",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub application: String,
    /// Event name, e.g. the responder name or [`EVENT_START`].
    pub name: String,
    pub level: AuditLevel,
    pub status: AuditStatus,
    pub duration_ms: Option<u64>,
    pub data: serde_json::Map<String, serde_json::Value>,
    pub children: Vec<AuditEvent>,
}

impl AuditEvent {
    pub fn new(application: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            application: application.into(),
            name: name.into(),
            level: AuditLevel::Info,
            status: AuditStatus::Undetermined,
            duration_ms: None,
            data: serde_json::Map::new(),
            children: Vec::new(),
        }
    }

    pub fn add_data(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Random 64-bit message identifier rendered as hex.
pub fn new_message_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}
