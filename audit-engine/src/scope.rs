use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use crate::entry::{AuditEvent, AuditLevel, AuditStatus, KEY_MESSAGE};
use crate::sink::AuditSink;

/// Owns an in-flight audit event and flushes it exactly once on drop.
///
/// A disabled scope accepts every call and records nothing. Child scopes
/// attach their event to the parent when dropped, so a child abandoned by an
/// early return is still recorded.
pub struct AuditScope {
    event: Option<AuditEvent>,
    target: Target,
    started: Instant,
    children: Arc<Mutex<Vec<AuditEvent>>>,
}

enum Target {
    Sink(Arc<dyn AuditSink>),
    Parent(Arc<Mutex<Vec<AuditEvent>>>),
    Detached,
}

impl AuditScope {
    pub fn new(sink: Arc<dyn AuditSink>, application: &str, name: &str) -> Self {
        Self::with_target(Some(AuditEvent::new(application, name)), Target::Sink(sink))
    }

    pub fn disabled() -> Self {
        Self::with_target(None, Target::Detached)
    }

    fn with_target(event: Option<AuditEvent>, target: Target) -> Self {
        Self {
            event,
            target,
            started: Instant::now(),
            children: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.event.is_some()
    }

    /// Starts a child event recorded under this one.
    pub fn child(&self, name: &str) -> AuditScope {
        match &self.event {
            Some(parent) => Self::with_target(
                Some(AuditEvent::new(parent.application.clone(), name)),
                Target::Parent(self.children.clone()),
            ),
            None => AuditScope::disabled(),
        }
    }

    pub fn add(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        if let Some(event) = self.event.as_mut() {
            event.add_data(key, value);
        }
    }

    pub fn fill(&mut self, level: AuditLevel, status: AuditStatus, message: Option<&str>) {
        if let Some(event) = self.event.as_mut() {
            event.level = level;
            event.status = status;
            if let Some(message) = message {
                event.add_data(KEY_MESSAGE, message);
            }
        }
    }

    /// Whether the current event already carries a failure.
    pub fn is_failed(&self) -> bool {
        self.event
            .as_ref()
            .is_some_and(|event| event.status == AuditStatus::Failed)
    }
}

impl Drop for AuditScope {
    fn drop(&mut self) {
        let Some(mut event) = self.event.take() else {
            return;
        };
        event.duration_ms = Some(elapsed_ms(self.started));
        if event.status == AuditStatus::Undetermined {
            event.status = AuditStatus::Successful;
        }
        event.children = std::mem::take(&mut *self.children.lock());

        match &self.target {
            Target::Sink(sink) => sink.log_event(event),
            Target::Parent(siblings) => siblings.lock().push(event),
            Target::Detached => {}
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
