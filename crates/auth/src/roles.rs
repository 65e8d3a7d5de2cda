use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role name used for role-gated checks.
///
/// Role names are compared exactly by the predicate. Uniqueness of names is
/// case-insensitive, but that is enforced by the role service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    /// Superuser role: satisfies every permission check.
    pub const ADMIN: RoleName = RoleName::from_static("admin");
    pub const MANAGER: RoleName = RoleName::from_static("manager");
    pub const EMPLOYEE: RoleName = RoleName::from_static("employee");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.as_str() == Self::ADMIN.as_str()
    }

    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(other)
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for RoleName {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}
