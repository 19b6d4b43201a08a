//! Audit trail contract for impersonation.
//!
//! Recording is best effort: a failing sink is logged and never fails or
//! rolls back the operation that produced the event.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use rolegate_core::UserId;
use rolegate_events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    ImpersonateStarted,
    ImpersonateStopped,
}

/// Where the request that triggered the event came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Always the real human, never the impersonated identity.
    pub actor_id: UserId,
    pub event_kind: AuditEventKind,
    pub target_id: UserId,
    pub context: Map<String, Value>,
    pub request_metadata: RequestMetadata,
    pub occurred_at: DateTime<Utc>,
}

impl Event for AuditEvent {
    fn event_type(&self) -> &'static str {
        match self.event_kind {
            AuditEventKind::ImpersonateStarted => "auth.impersonation.started",
            AuditEventKind::ImpersonateStopped => "auth.impersonation.stopped",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

pub(crate) fn record_best_effort(sink: &dyn AuditSink, event: &AuditEvent) {
    if let Err(err) = sink.record(event) {
        tracing::warn!(
            event_type = event.event_type(),
            actor_id = %event.actor_id,
            target_id = %event.target_id,
            error = %err,
            "audit sink rejected event"
        );
    }
}

/// Collects events in memory (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .map_err(|_| AuditError::Unavailable("audit log lock poisoned".into()))?
            .push(event.clone());
        Ok(())
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}
