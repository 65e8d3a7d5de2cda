//! Process-wide session store.
//!
//! Exactly one [`Session`] exists per running client. It is written only by
//! [`SessionStore::load_user`], [`SessionStore::login`],
//! [`SessionStore::logout`], [`SessionStore::refresh_user`] and
//! [`SessionStore::expire_session`]. Readers get cheap snapshots or
//! synchronous predicate answers and never mutate it.
//!
//! Lifecycle: `Uninitialized -> Loading -> {Authenticated | Anonymous}`.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use lmsgate_core::AccessError;

use crate::authorize;
use crate::token;
use crate::user::{MeResponse, SessionUser};
use crate::{PermissionKey, RoleName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

/// Cached session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user: Option<SessionUser>,
    pub permissions: BTreeSet<PermissionKey>,
    pub roles: Vec<RoleName>,
    pub is_authenticated: bool,
    /// `true` until the very first load resolves. Not a per-request busy flag.
    pub is_loading: bool,
    pub state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            permissions: BTreeSet::new(),
            roles: Vec::new(),
            is_authenticated: false,
            is_loading: true,
            state: SessionState::Uninitialized,
        }
    }
}

impl Session {
    /// An authenticated session built from a `/auth/me` response.
    pub fn from_identity(me: MeResponse) -> Self {
        let permissions = me.permission_set();
        let roles = me.user.effective_roles();
        Self {
            user: Some(me.user),
            permissions,
            roles,
            is_authenticated: true,
            is_loading: false,
            state: SessionState::Authenticated,
        }
    }

    /// A resolved session with nobody signed in.
    pub fn anonymous() -> Self {
        Self {
            is_loading: false,
            state: SessionState::Anonymous,
            ..Self::default()
        }
    }

    pub fn can(&self, permission: &PermissionKey) -> bool {
        authorize::can(self, permission)
    }

    pub fn has_any_role(&self, roles: &[RoleName]) -> bool {
        authorize::has_any_role(self, roles)
    }

    fn clear(&mut self) {
        self.user = None;
        self.permissions.clear();
        self.roles.clear();
        self.is_authenticated = false;
        self.state = SessionState::Anonymous;
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity service answered {status}")]
    Rejected { status: u16 },

    #[error("identity service unreachable: {0}")]
    Transport(String),

    #[error("unexpected identity response: {0}")]
    Malformed(String),
}

impl From<IdentityError> for AccessError {
    /// Every identity failure, including timeouts, counts as a rejection.
    fn from(value: IdentityError) -> Self {
        AccessError::auth_rejected(value.to_string())
    }
}

/// The remote identity service, as far as the session store needs it.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// `GET /auth/me` with the persisted bearer token.
    async fn current_user(&self) -> Result<MeResponse, IdentityError>;

    /// `POST /auth/logout`. Callers ignore the outcome.
    async fn logout(&self, token: Option<String>) -> Result<(), IdentityError>;
}

/// Where the bearer token is persisted between runs.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: String);
    fn clear(&self);
}

/// In-process token storage.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Single owner of the portal's [`Session`].
pub struct SessionStore {
    identity: Arc<dyn IdentityService>,
    tokens: Arc<dyn TokenStore>,
    session: RwLock<Session>,
    /// Bumped by every load, logout and expiry. A load whose number is no
    /// longer current when its response arrives is discarded.
    generation: AtomicU64,
}

impl SessionStore {
    pub fn new(identity: Arc<dyn IdentityService>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            identity,
            tokens,
            session: RwLock::new(Session::default()),
            generation: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Readers ────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn state(&self) -> SessionState {
        self.read().state
    }

    pub fn is_loading(&self) -> bool {
        self.read().is_loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.read().user.clone()
    }

    pub fn permissions(&self) -> BTreeSet<PermissionKey> {
        self.read().permissions.clone()
    }

    pub fn roles(&self) -> Vec<RoleName> {
        self.read().roles.clone()
    }

    pub fn can(&self, permission: &PermissionKey) -> bool {
        authorize::can(&self.read(), permission)
    }

    pub fn has_any_role(&self, roles: &[RoleName]) -> bool {
        authorize::has_any_role(&self.read(), roles)
    }

    /// The persisted bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.tokens.get()
    }

    // ── Writers ────────────────────────────────────────────────────────────

    /// Resolve the session from the persisted token.
    ///
    /// A missing or locally expired token goes straight to `Anonymous`
    /// without contacting the identity service. Never returns an error:
    /// token and identity failures end in an anonymous session.
    pub async fn load_user(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut session = self.write();
            if session.state == SessionState::Uninitialized {
                session.state = SessionState::Loading;
            }
        }

        let outcome = match self.tokens.get() {
            None => Err(AccessError::token_invalid("no persisted token")),
            Some(raw) => match token::inspect_at(&raw, Utc::now()) {
                Err(err) => Err(AccessError::token_invalid(err.to_string())),
                Ok(_) => self
                    .identity
                    .current_user()
                    .await
                    .map_err(AccessError::from),
            },
        };

        self.resolve(generation, outcome);
    }

    fn resolve(&self, generation: u64, outcome: Result<MeResponse, AccessError>) {
        let mut session = self.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "discarding superseded identity response");
            return;
        }

        match outcome {
            Ok(me) => {
                *session = Session::from_identity(me);
                if let Some(user) = &session.user {
                    tracing::info!(
                        user_id = %user.id,
                        roles = session.roles.len(),
                        permissions = session.permissions.len(),
                        "session authenticated"
                    );
                }
            }
            Err(err) => {
                self.tokens.clear();
                session.clear();
                match &err {
                    AccessError::TokenInvalid(reason) => {
                        tracing::debug!(%reason, "no usable token; session is anonymous");
                    }
                    other => tracing::warn!(error = %other, "identity service rejected session"),
                }
            }
        }
        session.is_loading = false;
    }

    /// Persist `token` and load the session it belongs to.
    ///
    /// Authentication is only observable once the identity service has
    /// accepted the token.
    pub async fn login(&self, token: impl Into<String>) {
        self.tokens.set(token.into());
        self.load_user().await;
    }

    /// Clear the session, then tell the server.
    ///
    /// The local half runs before this returns; the returned future only
    /// carries the best-effort server notification, whose failure is
    /// swallowed.
    pub fn logout(&self) -> impl Future<Output = ()> + Send + '_ {
        let token = self.clear_local();
        tracing::info!("session logged out");
        async move {
            if let Err(err) = self.identity.logout(token).await {
                tracing::debug!(error = %err, "logout notification failed; ignored");
            }
        }
    }

    /// Drop the token and session without contacting the server (the
    /// client-side half of a `401`).
    pub fn expire_session(&self) {
        if self.clear_local().is_some() {
            tracing::info!("session expired by the server");
        }
    }

    /// Re-run [`load_user`](Self::load_user) after a role or permission
    /// change that affects the acting user.
    pub async fn refresh_user(&self) {
        self.load_user().await;
    }

    fn clear_local(&self) -> Option<String> {
        let mut session = self.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        let token = self.tokens.get();
        self.tokens.clear();
        session.clear();
        session.is_loading = false;
        token
    }
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.read())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    use lmsgate_core::UserId;

    pub fn me(roles: &[&str], permissions: &[&str]) -> MeResponse {
        MeResponse {
            user: SessionUser {
                id: UserId::new(1),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                email: "test.user@example.com".to_string(),
                role: roles.first().map(|r| RoleName::new(r.to_string())),
                roles: Some(roles.iter().map(|r| RoleName::new(r.to_string())).collect()),
            },
            permissions: Some(
                permissions
                    .iter()
                    .map(|p| PermissionKey::new(p.to_string()))
                    .collect(),
            ),
        }
    }

    pub fn session_with(roles: &[&str], permissions: &[&str]) -> Session {
        Session::from_identity(me(roles, permissions))
    }
}
