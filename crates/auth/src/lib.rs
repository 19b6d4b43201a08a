//! `rolegate-auth`: role/permission authorization and impersonation core.
//!
//! This crate is decoupled from HTTP and storage: persistence, cache backend,
//! session store and audit/notification sinks are traits injected into
//! [`AccessControl`].

pub mod access;
pub mod audit;
pub mod cache;
pub mod directory;
pub mod error;
pub mod impersonation;
pub mod messages;
pub mod notify;
pub mod permissions;
pub mod policy;
pub mod roles;
pub mod session;
pub mod user;

pub use access::{AccessControl, AccessControlBuilder};
pub use audit::{AuditError, AuditEvent, AuditEventKind, AuditSink, InMemoryAuditLog, NullAuditSink, RequestMetadata};
pub use cache::{CacheError, CacheStore, InMemoryCacheStore, PermissionCache, RoleInvalidation};
pub use directory::{Directory, effective_permissions};
pub use error::{AccessError, NotFoundKind};
pub use impersonation::ImpersonationManager;
pub use messages::Locale;
pub use notify::{BusNotifier, Notifier, NotifyError, NullNotifier, RoleChanged};
pub use permissions::{DirectGrant, Permission, PermissionMeta, PermissionName, PermissionSet};
pub use policy::{Actor, Denial, DenialKind, ImpersonationScope, RolePolicy, TargetUser};
pub use roles::{Role, RoleName, Team};
pub use session::{AuthSession, InMemorySession, SecurityPrincipal, SessionPrincipal, SessionStore};
pub use user::User;
