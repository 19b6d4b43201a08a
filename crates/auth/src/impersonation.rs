//! Impersonation session state machine.
//!
//! ```text
//! NORMAL --start(actor, target) [policy ok]--> IMPERSONATING
//! IMPERSONATING --start--> denied (no nesting)
//! IMPERSONATING --stop [original resolves]--> NORMAL
//! IMPERSONATING --stop [original missing]--> NORMAL, logged out, error
//! NORMAL --stop--> denied
//! ```
//!
//! Guards read the same session keys the transitions write. Start/stop are
//! not atomic across concurrent requests of one session.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use rolegate_core::UserId;

use crate::audit::{self, AuditEvent, AuditEventKind, AuditSink, RequestMetadata};
use crate::error::{AccessError, NotFoundKind};
use crate::policy::{Actor, Denial, DenialKind, RolePolicy, TargetUser};
use crate::session::{AuthSession, SessionStore};
use crate::{Directory, User};

pub struct ImpersonationManager {
    directory: Arc<dyn Directory>,
    audit: Arc<dyn AuditSink>,
    policy: Arc<RolePolicy>,
}

impl ImpersonationManager {
    pub fn new(directory: Arc<dyn Directory>, audit: Arc<dyn AuditSink>, policy: Arc<RolePolicy>) -> Self {
        Self {
            directory,
            audit,
            policy,
        }
    }

    fn invalid_state(&self, kind: DenialKind) -> AccessError {
        AccessError::InvalidState(Denial::new(kind, self.policy.locale))
    }

    fn load_user(&self, id: UserId) -> Result<User, AccessError> {
        self.directory
            .user(id)?
            .ok_or_else(|| AccessError::not_found(NotFoundKind::User, id.to_string()))
    }

    /// NORMAL → IMPERSONATING. Returns the impersonated user.
    pub fn start<S: SessionStore>(
        &self,
        session: &AuthSession<S>,
        actor: &Actor,
        target_id: UserId,
        request: &RequestMetadata,
    ) -> Result<User, AccessError> {
        if session.is_impersonating() {
            tracing::info!(actor_id = %actor.user_id, %target_id, "nested impersonation refused");
            return Err(self.invalid_state(DenialKind::AlreadyImpersonating));
        }

        let actor_user = self.load_user(actor.user_id)?;
        let target = self.load_user(target_id)?;
        let target_role = match target.role_id {
            Some(role_id) => self.directory.role(role_id)?,
            None => None,
        };

        let view = TargetUser {
            user_id: target.id,
            is_active: target.is_active,
            role: target_role,
        };
        if let Err(denial) = self.policy.authorize_impersonation(actor, &view) {
            tracing::info!(
                actor_id = %actor.user_id,
                %target_id,
                kind = ?denial.kind,
                "impersonation denied"
            );
            return Err(AccessError::PermissionDenied(denial));
        }

        session.begin_impersonation(&actor_user, target.id);

        let mut context = Map::new();
        context.insert("original_user_name".into(), Value::String(actor_user.name.clone()));
        context.insert("target_user_name".into(), Value::String(target.name.clone()));
        audit::record_best_effort(
            &*self.audit,
            &AuditEvent {
                actor_id: actor_user.id,
                event_kind: AuditEventKind::ImpersonateStarted,
                target_id: target.id,
                context,
                request_metadata: request.clone(),
                occurred_at: Utc::now(),
            },
        );

        tracing::info!(actor_id = %actor_user.id, target_id = %target.id, "impersonation started");
        Ok(target)
    }

    /// IMPERSONATING → NORMAL. Returns the restored original user.
    ///
    /// If the original user no longer exists the session is logged out
    /// entirely (impersonation keys and principal) before the error is
    /// returned, so the browser is never stuck impersonating.
    pub fn stop<S: SessionStore>(
        &self,
        session: &AuthSession<S>,
        request: &RequestMetadata,
    ) -> Result<User, AccessError> {
        if !session.is_impersonating() {
            return Err(self.invalid_state(DenialKind::NotImpersonating));
        }

        let impersonated = session.active_user_id();
        let original_id = session.original_user_id();

        let original = match original_id {
            Some(id) => self.directory.user(id)?,
            None => None,
        };
        let Some(original) = original else {
            tracing::error!(
                original_user_id = ?original_id,
                impersonated_user_id = ?impersonated,
                "impersonator no longer exists; clearing session"
            );
            session.logout();
            return Err(AccessError::InconsistentSession {
                original_user_id: original_id,
            });
        };

        session.restore(original.id);

        if let Some(impersonated) = impersonated {
            let mut context = Map::new();
            context.insert("original_user_name".into(), Value::String(original.name.clone()));
            audit::record_best_effort(
                &*self.audit,
                &AuditEvent {
                    actor_id: original.id,
                    event_kind: AuditEventKind::ImpersonateStopped,
                    target_id: impersonated,
                    context,
                    request_metadata: request.clone(),
                    occurred_at: Utc::now(),
                },
            );
        }

        tracing::info!(
            original_user_id = %original.id,
            impersonated_user_id = ?impersonated,
            "impersonation stopped"
        );
        Ok(original)
    }
}
