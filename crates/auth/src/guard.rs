//! Route gating for protected navigable regions.
//!
//! A guard is a pure function of the current [`Session`]. It holds no state of
//! its own and must be re-evaluated whenever the session changes.

use crate::navigation::Redirect;
use crate::session::Session;
use crate::{PermissionKey, RoleName};

/// What a protected region should do for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The first session load has not resolved yet; show a neutral placeholder.
    Loading,
    /// Leave the region. Guard redirects always replace history.
    Redirect(Redirect),
    /// Show the protected content.
    Render,
}

/// Gate configuration for one protected region.
///
/// - `allowed_roles`: pass if the user holds any of them.
/// - `required_permissions`: pass if the user holds any of them (OR).
/// - `required_permission`: legacy single key, checked in addition to the
///   list above (AND).
///
/// The OR/AND asymmetry is relied upon by existing route configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    allowed_roles: Vec<RoleName>,
    required_permissions: Vec<PermissionKey>,
    required_permission: Option<PermissionKey>,
}

impl RouteGuard {
    /// Only requires a signed-in user.
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn allow_roles(mut self, roles: impl IntoIterator<Item = RoleName>) -> Self {
        self.allowed_roles.extend(roles);
        self
    }

    pub fn require_any_permission(
        mut self,
        permissions: impl IntoIterator<Item = PermissionKey>,
    ) -> Self {
        self.required_permissions.extend(permissions);
        self
    }

    pub fn require_permission(mut self, permission: PermissionKey) -> Self {
        self.required_permission = Some(permission);
        self
    }

    pub fn allowed_roles(&self) -> &[RoleName] {
        &self.allowed_roles
    }

    pub fn required_permissions(&self) -> &[PermissionKey] {
        &self.required_permissions
    }

    pub fn required_permission(&self) -> Option<&PermissionKey> {
        self.required_permission.as_ref()
    }

    /// Evaluate the gate. Steps run in a fixed order and the first match wins.
    pub fn evaluate(&self, session: &Session) -> GuardOutcome {
        if session.is_loading {
            return GuardOutcome::Loading;
        }

        if !session.is_authenticated {
            return GuardOutcome::Redirect(Redirect::SignIn);
        }

        if !self.allowed_roles.is_empty() && !session.has_any_role(&self.allowed_roles) {
            tracing::debug!(allowed = ?self.allowed_roles, "route denied: role not allowed");
            return GuardOutcome::Redirect(Redirect::Unauthorized(None));
        }

        if !self.required_permissions.is_empty()
            && !self.required_permissions.iter().any(|p| session.can(p))
        {
            tracing::debug!(
                any_of = ?self.required_permissions,
                "route denied: no listed permission"
            );
            return GuardOutcome::Redirect(Redirect::Unauthorized(None));
        }

        if let Some(permission) = &self.required_permission {
            if !session.can(permission) {
                tracing::debug!(%permission, "route denied: missing permission");
                return GuardOutcome::Redirect(Redirect::Unauthorized(None));
            }
        }

        GuardOutcome::Render
    }
}
