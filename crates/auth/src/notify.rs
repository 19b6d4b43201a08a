//! Role-change broadcast.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rolegate_core::UserId;
use rolegate_events::{Event, EventBus};

use crate::RoleName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChanged {
    pub user_id: UserId,
    pub new_role_name: RoleName,
    pub occurred_at: DateTime<Utc>,
}

impl Event for RoleChanged {
    fn event_type(&self) -> &'static str {
        "auth.user.role_changed"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("failed to publish notification: {0}")]
    Publish(String),
}

/// Fire-and-forget sink for role changes.
pub trait Notifier: Send + Sync {
    fn role_changed(&self, event: RoleChanged) -> Result<(), NotifyError>;
}

/// Publishes role changes on an [`EventBus`].
#[derive(Debug, Clone)]
pub struct BusNotifier<B> {
    bus: B,
}

impl<B> BusNotifier<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }
}

impl<B> Notifier for BusNotifier<B>
where
    B: EventBus<RoleChanged>,
{
    fn role_changed(&self, event: RoleChanged) -> Result<(), NotifyError> {
        self.bus
            .publish(event)
            .map_err(|e| NotifyError::Publish(format!("{e:?}")))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn role_changed(&self, _event: RoleChanged) -> Result<(), NotifyError> {
        Ok(())
    }
}

pub(crate) fn notify_best_effort(notifier: &dyn Notifier, event: RoleChanged) {
    let user_id = event.user_id;
    if let Err(err) = notifier.role_changed(event) {
        tracing::warn!(%user_id, error = %err, "role change notification dropped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rolegate_events::InMemoryEventBus;

    use super::*;

    #[test]
    fn bus_notifier_publishes_to_subscribers() {
        let bus: Arc<InMemoryEventBus<RoleChanged>> = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let notifier = BusNotifier::new(bus.clone());

        let event = RoleChanged {
            user_id: UserId::new(),
            new_role_name: RoleName::Admin,
            occurred_at: Utc::now(),
        };
        notifier.role_changed(event.clone()).unwrap();

        assert_eq!(sub.try_recv().unwrap(), event);
    }
}
