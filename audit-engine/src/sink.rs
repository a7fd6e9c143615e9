use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::entry::{AuditEvent, AuditLevel};

/// Destination for finished audit events.
pub trait AuditSink: Send + Sync {
    fn log_event(&self, event: AuditEvent);
}

/// Writes events as structured `tracing` records under the `audit` target.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn log_event(&self, event: AuditEvent) {
        let data = serde_json::Value::Object(event.data.clone()).to_string();
        let children = serde_json::to_string(&event.children).unwrap_or_default();
        match event.level {
            AuditLevel::Info => info!(
                target: "audit",
                id = %event.id,
                application = %event.application,
                name = %event.name,
                status = %event.status,
                duration_ms = ?event.duration_ms,
                data = %data,
                children = %children,
                "Audit event"
            ),
            AuditLevel::Warn => warn!(
                target: "audit",
                id = %event.id,
                application = %event.application,
                name = %event.name,
                status = %event.status,
                duration_ms = ?event.duration_ms,
                data = %data,
                children = %children,
                "Audit event"
            ),
            AuditLevel::Error => error!(
                target: "audit",
                id = %event.id,
                application = %event.application,
                name = %event.name,
                status = %event.status,
                duration_ms = ?event.duration_ms,
                data = %data,
                children = %children,
                "Audit event"
            ),
        }
    }
}

/// Keeps events in memory; used by tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn log_event(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn log_event(&self, _event: AuditEvent) {}
}
