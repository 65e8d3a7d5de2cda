//! Authorization predicate over a session snapshot.
//!
//! - No IO
//! - No panics
//! - Precedence is fixed: no user, then admin bypass, then explicit grant.

use serde::Serialize;

use crate::session::Session;
use crate::{PermissionKey, RoleName};

/// Which rule decided a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// No user is loaded.
    NoUser,
    /// The user holds the `admin` role; permissions are not consulted.
    AdminBypass,
    /// The key is in the user's explicit permission list.
    ExplicitPermission,
    /// None of the above.
    MissingPermission,
}

/// Outcome of a permission check, with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub permission: PermissionKey,
    pub granted: bool,
    pub rule: Rule,
}

/// Explain how `can(session, permission)` would be decided.
pub fn explain(session: &Session, permission: &PermissionKey) -> Decision {
    let rule = if session.user.is_none() {
        Rule::NoUser
    } else if session.roles.iter().any(RoleName::is_admin) {
        Rule::AdminBypass
    } else if session.permissions.contains(permission) {
        Rule::ExplicitPermission
    } else {
        Rule::MissingPermission
    };

    Decision {
        permission: permission.clone(),
        granted: matches!(rule, Rule::AdminBypass | Rule::ExplicitPermission),
        rule,
    }
}

/// Whether the session may use `permission`.
///
/// Admins are never permission-gated, only role-gated.
pub fn can(session: &Session, permission: &PermissionKey) -> bool {
    explain(session, permission).granted
}

/// Whether the session's role set intersects `roles`.
///
/// This is the canonical role test: a user may hold several roles at once,
/// so single-role equality is never used.
pub fn has_any_role(session: &Session, roles: &[RoleName]) -> bool {
    session.user.is_some() && roles.iter().any(|r| session.roles.contains(r))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::permissions::keys;
    use crate::session::test_support::session_with;

    #[test]
    fn no_user_denies_everything() {
        let session = Session::default();
        assert!(!can(&session, &keys::ROLE_VIEW));
        assert!(!has_any_role(&session, &[RoleName::ADMIN]));
        assert_eq!(explain(&session, &keys::ROLE_VIEW).rule, Rule::NoUser);
    }

    #[test]
    fn admin_bypasses_permission_list() {
        let session = session_with(&["employee", "admin"], &[]);
        for key in ["role_edit", "view_logs", "anything_at_all"] {
            assert!(can(&session, &PermissionKey::new(key)));
        }
        assert_eq!(explain(&session, &keys::VIEW_LOGS).rule, Rule::AdminBypass);
    }

    #[test]
    fn explicit_permission_grants() {
        let session = session_with(&["manager"], &["course_view"]);
        let course_view = PermissionKey::new("course_view");
        assert!(can(&session, &course_view));
        assert_eq!(explain(&session, &course_view).rule, Rule::ExplicitPermission);
        assert!(!can(&session, &keys::ROLE_EDIT));
        assert_eq!(explain(&session, &keys::ROLE_EDIT).rule, Rule::MissingPermission);
    }

    #[test]
    fn role_test_is_set_intersection() {
        let session = session_with(&["employee", "manager"], &[]);
        assert!(has_any_role(&session, &[RoleName::MANAGER, RoleName::ADMIN]));
        assert!(has_any_role(&session, &[RoleName::EMPLOYEE]));
        assert!(!has_any_role(&session, &[RoleName::ADMIN]));
        assert!(!has_any_role(&session, &[]));
    }

    #[test]
    fn role_names_are_case_sensitive_in_checks() {
        let session = session_with(&["Admin"], &[]);
        assert!(!has_any_role(&session, &[RoleName::ADMIN]));
        assert!(!can(&session, &keys::ROLE_EDIT));
    }
}
