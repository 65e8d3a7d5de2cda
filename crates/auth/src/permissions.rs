use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use lmsgate_core::PermissionId;

/// Permission key (an atomic capability such as `"role_edit"`).
///
/// Keys are opaque strings at this layer. The catalogue that defines them is
/// owned by the role service and fetched, never derived client-side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionKey(Cow<'static, str>);

impl PermissionKey {
    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self(key.into())
    }

    pub const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for PermissionKey {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

/// A catalogue entry as served by `GET /roles/permissions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub key: PermissionKey,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Permission keys the portal itself gates on.
pub mod keys {
    use super::PermissionKey;

    pub const ROLE_VIEW: PermissionKey = PermissionKey::from_static("role_view");
    pub const ROLE_EDIT: PermissionKey = PermissionKey::from_static("role_edit");
    pub const USER_EDIT: PermissionKey = PermissionKey::from_static("user_edit");

    pub const VIEW_OWN_COURSES: PermissionKey = PermissionKey::from_static("view_own_courses");
    pub const VIEW_OWN_CERTIFICATES: PermissionKey =
        PermissionKey::from_static("view_own_certificates");
    pub const VIEW_OWN_CAREER_PATH: PermissionKey =
        PermissionKey::from_static("view_own_career_path");

    pub const VIEW_TEAM: PermissionKey = PermissionKey::from_static("view_team");
    pub const ASSIGN_COURSES_TEAM: PermissionKey =
        PermissionKey::from_static("assign_courses_team");
    pub const VIEW_TEAM_CERTIFICATES: PermissionKey =
        PermissionKey::from_static("view_team_certificates");

    pub const VIEW_ORG_ANALYTICS: PermissionKey = PermissionKey::from_static("view_org_analytics");
    pub const MANAGE_COURSES: PermissionKey = PermissionKey::from_static("manage_courses");
    pub const MANAGE_EMPLOYEES: PermissionKey = PermissionKey::from_static("manage_employees");
    pub const MANAGE_ROLES: PermissionKey = PermissionKey::from_static("manage_roles");
    pub const VIEW_LOGS: PermissionKey = PermissionKey::from_static("view_logs");
}
