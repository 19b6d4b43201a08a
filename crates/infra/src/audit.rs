//! Audit sinks backed by the log stream and the event bus.

use rolegate_auth::{AuditError, AuditEvent, AuditSink};
use rolegate_events::{Event, EventBus};

/// Writes each audit event as one structured record on the
/// `rolegate::audit` target.
///
/// Route that target to durable storage in the subscriber setup.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let payload = serde_json::to_string(event).map_err(|e| AuditError::Unavailable(e.to_string()))?;
        tracing::info!(
            target: "rolegate::audit",
            event_type = event.event_type(),
            actor_id = %event.actor_id,
            target_id = %event.target_id,
            payload = %payload,
            "audit event"
        );
        Ok(())
    }
}

/// Publishes audit events on an [`EventBus`] for downstream persistence.
#[derive(Debug, Clone)]
pub struct BusAuditSink<B> {
    bus: B,
}

impl<B> BusAuditSink<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }
}

impl<B> AuditSink for BusAuditSink<B>
where
    B: EventBus<AuditEvent>,
{
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.bus
            .publish(event.clone())
            .map_err(|e| AuditError::Unavailable(format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rolegate_auth::{AuditEventKind, RequestMetadata};
    use rolegate_core::UserId;
    use rolegate_events::InMemoryEventBus;

    use super::*;

    fn started() -> AuditEvent {
        AuditEvent {
            actor_id: UserId::new(),
            event_kind: AuditEventKind::ImpersonateStarted,
            target_id: UserId::new(),
            context: serde_json::Map::new(),
            request_metadata: RequestMetadata::default(),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn bus_sink_forwards_events() {
        let bus: Arc<InMemoryEventBus<AuditEvent>> = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let sink = BusAuditSink::new(bus.clone());

        let event = started();
        sink.record(&event).unwrap();

        assert_eq!(sub.drain(), vec![event]);
    }

    #[test]
    fn tracing_sink_accepts_events() {
        assert!(TracingAuditSink.record(&started()).is_ok());
    }
}
