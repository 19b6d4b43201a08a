#![allow(dead_code)]

use std::sync::Arc;

use rolegate_auth::{
    AccessControl, AccessControlBuilder, AuditError, AuditEvent, AuditSink, AuthSession, BusNotifier, Directory,
    InMemoryAuditLog, InMemoryCacheStore, InMemorySession, Notifier, NotifyError, RoleChanged, RoleName,
    SecurityPrincipal, User,
};
use rolegate_events::InMemoryEventBus;
use rolegate_infra::InMemoryDirectory;

pub struct Fixture {
    pub directory: Arc<InMemoryDirectory>,
    pub cache: Arc<InMemoryCacheStore>,
    pub audit: Arc<InMemoryAuditLog>,
    pub bus: Arc<InMemoryEventBus<RoleChanged>>,
    pub access: AccessControl,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    /// Seeded directory, in-memory cache/audit/bus, plus caller tweaks.
    pub fn with(configure: impl FnOnce(AccessControlBuilder) -> AccessControlBuilder) -> Self {
        let directory = Arc::new(InMemoryDirectory::seeded().unwrap());
        let cache = Arc::new(InMemoryCacheStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let bus: Arc<InMemoryEventBus<RoleChanged>> = Arc::new(InMemoryEventBus::new());

        let builder = AccessControl::builder(directory.clone(), cache.clone())
            .audit(audit.clone())
            .notifier(Arc::new(BusNotifier::new(bus.clone())));
        let access = configure(builder).build();

        Self {
            directory,
            cache,
            audit,
            bus,
            access,
        }
    }

    pub fn user(&self, name: &str, role: Option<RoleName>) -> User {
        let mut user = User::new(name, format!("{}@example.com", name.to_lowercase()));
        if let Some(role) = role {
            let role = self.directory.role_by_name(&role).unwrap().unwrap();
            user = user.with_role(role.id);
        }
        self.directory.insert_user(user).unwrap()
    }

    pub fn inactive_user(&self, name: &str, role: RoleName) -> User {
        let user = self.user(name, Some(role));
        self.directory.set_active(user.id, false).unwrap();
        user
    }

    pub fn role_of(&self, user: &User) -> Option<RoleName> {
        let user = self.directory.user(user.id).unwrap()?;
        let role = self.directory.role(user.role_id?).unwrap()?;
        Some(role.name)
    }

    pub fn logged_in(&self, user: &User) -> AuthSession<InMemorySession> {
        let session = AuthSession::new(InMemorySession::new());
        session.login(user.id);
        session
    }
}

pub fn principal(user: &User) -> SecurityPrincipal {
    SecurityPrincipal::authenticated(user.id)
}

pub fn role_names(roles: &[rolegate_auth::Role]) -> Vec<String> {
    roles.iter().map(|r| r.name.to_string()).collect()
}

/// Audit backend that rejects every event.
pub struct FailingAuditSink;

impl AuditSink for FailingAuditSink {
    fn record(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit backend down".into()))
    }
}

/// Broadcast channel that rejects every message.
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn role_changed(&self, _event: RoleChanged) -> Result<(), NotifyError> {
        Err(NotifyError::Publish("broadcast channel down".into()))
    }
}
