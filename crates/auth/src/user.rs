//! The signed-in user as reported by the identity service.
//!
//! The client never edits a user locally. Changes to a user's roles arrive
//! only through a fresh `/auth/me` round-trip.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use lmsgate_core::UserId;

use crate::{PermissionKey, RoleName};

/// User record embedded in the `/auth/me` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub email: String,

    /// Legacy single-role field. Still the primary role for display and for
    /// picking the landing page.
    #[serde(default)]
    pub role: Option<RoleName>,

    /// Every role the user holds. Absent on older identity service builds.
    #[serde(default)]
    pub roles: Option<Vec<RoleName>>,
}

impl SessionUser {
    /// Effective role list: the multi-role list when present (even if empty),
    /// otherwise the legacy single role.
    pub fn effective_roles(&self) -> Vec<RoleName> {
        match &self.roles {
            Some(roles) => roles.clone(),
            None => self.role.iter().cloned().collect(),
        }
    }

    /// Role used for display and landing-page selection.
    pub fn primary_role(&self) -> Option<&RoleName> {
        self.role
            .as_ref()
            .or_else(|| self.roles.as_ref().and_then(|r| r.first()))
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Up to two upper-cased initials, e.g. `"AK"`.
    pub fn initials(&self) -> String {
        [&self.first_name, &self.last_name]
            .iter()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}

/// Body of `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: SessionUser,

    #[serde(default)]
    pub permissions: Option<Vec<PermissionKey>>,
}

impl MeResponse {
    pub fn permission_set(&self) -> BTreeSet<PermissionKey> {
        self.permissions.iter().flatten().cloned().collect()
    }
}
