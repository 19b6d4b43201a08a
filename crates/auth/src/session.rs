//! Session-held identity: the authenticated principal and the impersonation
//! keys, kept in the same per-browser-session store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use rolegate_core::UserId;

use crate::User;

pub const AUTH_USER_KEY: &str = "auth.user_id";
pub const ORIGINAL_USER_ID_KEY: &str = "impersonation.original_user_id";
pub const ORIGINAL_USER_NAME_KEY: &str = "impersonation.original_user_name";

/// Key/value store scoped to one authenticated browser session.
pub trait SessionStore: Send + Sync {
    fn put(&self, key: &str, value: Value);

    fn get(&self, key: &str) -> Option<Value>;

    /// Get and remove.
    fn pull(&self, key: &str) -> Option<Value>;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn put(&self, key: &str, value: Value) {
        (**self).put(key, value)
    }

    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }

    fn pull(&self, key: &str) -> Option<Value> {
        (**self).pull(key)
    }

    fn has(&self, key: &str) -> bool {
        (**self).has(key)
    }
}

/// In-memory session for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySession {
    values: RwLock<HashMap<String, Value>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySession {
    fn put(&self, key: &str, value: Value) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value);
        }
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn pull(&self, key: &str) -> Option<Value> {
        self.values.write().ok()?.remove(key)
    }
}

/// The identity privileged decisions are made against: the real human, even
/// while they are impersonating someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecurityPrincipal(UserId);

impl SecurityPrincipal {
    /// For callers that authenticate outside a browser session (jobs, CLIs).
    pub fn authenticated(user_id: UserId) -> Self {
        Self(user_id)
    }

    pub fn user_id(&self) -> UserId {
        self.0
    }
}

/// The identity currently driving the UI, possibly an impersonated user.
///
/// Only for display and menu simulation. Never authorize with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionPrincipal(UserId);

impl SessionPrincipal {
    pub fn user_id(&self) -> UserId {
        self.0
    }
}

/// Authentication and impersonation state stored in a [`SessionStore`].
///
/// The presence of [`ORIGINAL_USER_ID_KEY`] is the sole signal of
/// "currently impersonating".
#[derive(Debug)]
pub struct AuthSession<S> {
    store: S,
}

impl<S: SessionStore> AuthSession<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn login(&self, user: UserId) {
        self.store.put(AUTH_USER_KEY, Value::String(user.to_string()));
    }

    /// Forget the principal and any impersonation in progress.
    pub fn logout(&self) {
        self.clear_impersonation();
        self.store.pull(AUTH_USER_KEY);
    }

    pub fn is_impersonating(&self) -> bool {
        self.store.has(ORIGINAL_USER_ID_KEY)
    }

    fn read_user_id(&self, key: &str) -> Option<UserId> {
        self.store.get(key)?.as_str()?.parse().ok()
    }

    /// The user whose identity is currently active.
    pub(crate) fn active_user_id(&self) -> Option<UserId> {
        self.read_user_id(AUTH_USER_KEY)
    }

    pub fn original_user_id(&self) -> Option<UserId> {
        self.read_user_id(ORIGINAL_USER_ID_KEY)
    }

    pub fn original_user_name(&self) -> Option<String> {
        self.store
            .get(ORIGINAL_USER_NAME_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Identity for authorization and audit attribution.
    pub fn security_principal(&self) -> Option<SecurityPrincipal> {
        if self.is_impersonating() {
            self.original_user_id().map(SecurityPrincipal)
        } else {
            self.active_user_id().map(SecurityPrincipal)
        }
    }

    /// Identity for UI simulation.
    pub fn session_principal(&self) -> Option<SessionPrincipal> {
        self.active_user_id().map(SessionPrincipal)
    }

    pub(crate) fn begin_impersonation(&self, original: &User, target: UserId) {
        self.store
            .put(ORIGINAL_USER_ID_KEY, Value::String(original.id.to_string()));
        self.store
            .put(ORIGINAL_USER_NAME_KEY, Value::String(original.name.clone()));
        self.login(target);
    }

    pub(crate) fn restore(&self, original: UserId) {
        self.login(original);
        self.clear_impersonation();
    }

    pub(crate) fn clear_impersonation(&self) {
        self.store.pull(ORIGINAL_USER_ID_KEY);
        self.store.pull(ORIGINAL_USER_NAME_KEY);
    }
}
