//! Portal navigation: redirect targets, the protected route table, landing
//! pages and menu visibility.

use crate::guard::{GuardOutcome, RouteGuard};
use crate::permissions::keys;
use crate::session::Session;
use crate::user::SessionUser;
use crate::{PermissionKey, RoleName};

pub const ROOT_PATH: &str = "/";
pub const SIGN_IN_PATH: &str = "/login";
pub const CALLBACK_PATH: &str = "/auth/callback";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

pub const ADMIN_LANDING: &str = "/admin/analytics";
pub const MANAGER_LANDING: &str = "/manager/dashboard";
pub const EMPLOYEE_LANDING: &str = "/employee/dashboard";

/// Receives history-replacing navigations (guard redirects, the 401/403
/// interceptor, sign-in completion).
pub trait Navigator: Send + Sync {
    fn replace(&self, path: &str);
}

/// Why the unauthorized page is shown. Drives its message only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthorizedReason {
    NotRegistered,
    Deactivated,
    Other(String),
}

impl UnauthorizedReason {
    pub fn from_code(code: &str) -> Self {
        match code {
            "not_registered" => Self::NotRegistered,
            "deactivated" => Self::Deactivated,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::NotRegistered => "not_registered",
            Self::Deactivated => "deactivated",
            Self::Other(code) => code,
        }
    }
}

/// Text for the unauthorized page.
pub fn unauthorized_message(reason: Option<&UnauthorizedReason>) -> &'static str {
    match reason {
        Some(UnauthorizedReason::NotRegistered) => concat!(
            "Your account is not registered in the portal. ",
            "Please contact your admin to sync your account."
        ),
        Some(UnauthorizedReason::Deactivated) => {
            "Your account has been deactivated. Please contact your admin."
        }
        _ => "You don't have permission to access this page.",
    }
}

/// Where a guard or interceptor sends the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// Sign-in entry point. The attempted path is not preserved.
    SignIn,
    Unauthorized(Option<UnauthorizedReason>),
}

impl Redirect {
    pub fn path(&self) -> String {
        match self {
            Self::SignIn => SIGN_IN_PATH.to_string(),
            Self::Unauthorized(None) => UNAUTHORIZED_PATH.to_string(),
            Self::Unauthorized(Some(reason)) => {
                format!("{UNAUTHORIZED_PATH}?reason={}", reason.code())
            }
        }
    }

    pub fn replaces_history(&self) -> bool {
        true
    }
}

/// Landing page chosen by the user's primary role.
pub fn landing_path(user: &SessionUser) -> &'static str {
    match user.primary_role().map(RoleName::as_str) {
        Some("admin") => ADMIN_LANDING,
        Some("manager") => MANAGER_LANDING,
        _ => EMPLOYEE_LANDING,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Protected(RouteGuard),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub access: Access,
}

impl Route {
    pub fn public(path: &'static str) -> Self {
        Self {
            path,
            access: Access::Public,
        }
    }

    pub fn protected(path: &'static str, guard: RouteGuard) -> Self {
        Self {
            path,
            access: Access::Protected(guard),
        }
    }
}

/// Result of resolving a path against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Loading,
    Render(&'static str),
    /// Replace the current history entry with this path.
    Replace(String),
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The portal's routes.
    pub fn portal() -> Self {
        let signed_in = RouteGuard::authenticated;
        Self::new(vec![
            Route::public(SIGN_IN_PATH),
            Route::public(CALLBACK_PATH),
            Route::public(UNAUTHORIZED_PATH),
            Route::protected(ROOT_PATH, signed_in()),
            Route::protected("/profile", signed_in()),
            Route::protected(EMPLOYEE_LANDING, signed_in()),
            Route::protected(
                MANAGER_LANDING,
                signed_in().allow_roles([RoleName::MANAGER, RoleName::ADMIN]),
            ),
            Route::protected(ADMIN_LANDING, signed_in().allow_roles([RoleName::ADMIN])),
            Route::protected(
                "/admin/roles",
                signed_in().require_permission(keys::MANAGE_ROLES),
            ),
            Route::protected(
                "/admin/employees",
                signed_in().require_permission(keys::MANAGE_EMPLOYEES),
            ),
        ])
    }

    pub fn get(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.path == path)
    }

    /// Decide what `path` shows for `session`.
    ///
    /// Unknown paths go to `/`; `/` itself forwards to the landing page; the
    /// sign-in page forwards signed-in users to `/`.
    pub fn resolve(&self, path: &str, session: &Session) -> Resolution {
        let Some(route) = self.get(path) else {
            return Resolution::Replace(ROOT_PATH.to_string());
        };

        match &route.access {
            Access::Public => {
                if route.path == SIGN_IN_PATH && !session.is_loading && session.is_authenticated {
                    Resolution::Replace(ROOT_PATH.to_string())
                } else {
                    Resolution::Render(route.path)
                }
            }
            Access::Protected(guard) => match guard.evaluate(session) {
                GuardOutcome::Loading => Resolution::Loading,
                GuardOutcome::Redirect(redirect) => Resolution::Replace(redirect.path()),
                GuardOutcome::Render if route.path == ROOT_PATH => match &session.user {
                    Some(user) => Resolution::Replace(landing_path(user).to_string()),
                    None => Resolution::Replace(SIGN_IN_PATH.to_string()),
                },
                GuardOutcome::Render => Resolution::Render(route.path),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
}

const EMPLOYEE_ITEMS: [(&str, &str, PermissionKey); 3] = [
    ("My Courses", "/employee/courses", keys::VIEW_OWN_COURSES),
    ("Certificates", "/employee/certificates", keys::VIEW_OWN_CERTIFICATES),
    ("Career Path", "/employee/career-path", keys::VIEW_OWN_CAREER_PATH),
];

const MANAGER_ITEMS: [(&str, &str, PermissionKey); 3] = [
    ("My Team", "/manager/team", keys::VIEW_TEAM),
    ("Assignments", "/manager/assignments", keys::ASSIGN_COURSES_TEAM),
    ("Team Certificates", "/manager/certificates", keys::VIEW_TEAM_CERTIFICATES),
];

const ADMIN_ITEMS: [(&str, &str, Option<PermissionKey>); 6] = [
    ("Analytics", ADMIN_LANDING, Some(keys::VIEW_ORG_ANALYTICS)),
    ("Organization", "/admin/organization", None),
    ("Courses", "/admin/courses", Some(keys::MANAGE_COURSES)),
    ("Employees", "/admin/employees", Some(keys::MANAGE_EMPLOYEES)),
    ("Roles", "/admin/roles", Some(keys::MANAGE_ROLES)),
    ("Logs", "/admin/logger", Some(keys::VIEW_LOGS)),
];

/// Menu entries visible to `session`, in display order.
pub fn nav_items(session: &Session) -> Vec<NavItem> {
    let Some(user) = &session.user else {
        return Vec::new();
    };

    let mut items = vec![NavItem { label: "Dashboard", path: landing_path(user) }];

    items.extend(
        EMPLOYEE_ITEMS
            .iter()
            .filter(|(_, _, key)| session.can(key))
            .map(|(label, path, _)| NavItem { label: *label, path: *path }),
    );

    if session.has_any_role(&[RoleName::MANAGER, RoleName::ADMIN]) {
        items.extend(
            MANAGER_ITEMS
                .iter()
                .filter(|(_, _, key)| session.can(key))
                .map(|(label, path, _)| NavItem { label: *label, path: *path }),
        );
    }

    if session.has_any_role(&[RoleName::ADMIN]) {
        items.extend(
            ADMIN_ITEMS
                .iter()
                .filter(|(_, _, key)| key.as_ref().is_none_or(|k| session.can(k)))
                .map(|(label, path, _)| NavItem { label: *label, path: *path }),
        );
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::session::test_support::session_with;

    #[test]
    fn redirect_paths() {
        assert_eq!(Redirect::SignIn.path(), "/login");
        assert_eq!(Redirect::Unauthorized(None).path(), "/unauthorized");
        assert_eq!(
            Redirect::Unauthorized(Some(UnauthorizedReason::Deactivated)).path(),
            "/unauthorized?reason=deactivated"
        );
        assert!(Redirect::SignIn.replaces_history());
    }

    #[test]
    fn unauthorized_messages() {
        let reason = UnauthorizedReason::from_code("not_registered");
        assert_eq!(reason, UnauthorizedReason::NotRegistered);
        assert!(unauthorized_message(Some(&reason)).contains("not registered"));
        assert_eq!(
            unauthorized_message(Some(&UnauthorizedReason::from_code("bogus"))),
            "You don't have permission to access this page."
        );
        assert_eq!(
            unauthorized_message(None),
            "You don't have permission to access this page."
        );
    }

    #[test]
    fn landing_follows_primary_role() {
        let admin = session_with(&["admin", "manager"], &[]);
        let manager = session_with(&["manager"], &[]);
        let employee = session_with(&["employee"], &[]);
        assert_eq!(landing_path(admin.user.as_ref().unwrap()), ADMIN_LANDING);
        assert_eq!(landing_path(manager.user.as_ref().unwrap()), MANAGER_LANDING);
        assert_eq!(landing_path(employee.user.as_ref().unwrap()), EMPLOYEE_LANDING);
    }

    #[test]
    fn resolve_walks_the_route_table() {
        let table = RouteTable::portal();
        let manager = session_with(&["manager"], &["course_view"]);

        assert_eq!(table.resolve("/", &manager), Resolution::Replace(MANAGER_LANDING.into()));
        assert_eq!(table.resolve(MANAGER_LANDING, &manager), Resolution::Render(MANAGER_LANDING));
        assert_eq!(
            table.resolve(ADMIN_LANDING, &manager),
            Resolution::Replace(UNAUTHORIZED_PATH.into())
        );
        assert_eq!(table.resolve("/nope", &manager), Resolution::Replace("/".into()));
        assert_eq!(table.resolve(SIGN_IN_PATH, &manager), Resolution::Replace("/".into()));
    }

    #[test]
    fn role_screen_needs_manage_roles_like_its_menu_entry() {
        let table = RouteTable::portal();

        let viewer = session_with(&["manager"], &["role_view"]);
        assert_eq!(
            table.resolve("/admin/roles", &viewer),
            Resolution::Replace(UNAUTHORIZED_PATH.into())
        );
        assert!(nav_items(&viewer).iter().all(|i| i.path != "/admin/roles"));

        let manager = session_with(&["manager"], &["manage_roles"]);
        assert_eq!(
            table.resolve("/admin/roles", &manager),
            Resolution::Render("/admin/roles")
        );
    }

    #[test]
    fn resolve_while_loading_or_signed_out() {
        let table = RouteTable::portal();
        assert_eq!(table.resolve("/profile", &Session::default()), Resolution::Loading);
        assert_eq!(
            table.resolve("/profile", &Session::anonymous()),
            Resolution::Replace(SIGN_IN_PATH.into())
        );
        assert_eq!(
            table.resolve(SIGN_IN_PATH, &Session::anonymous()),
            Resolution::Render(SIGN_IN_PATH)
        );
    }

    #[test]
    fn menu_respects_roles_and_permissions() {
        let employee = session_with(&["employee"], &["view_own_courses", "view_team"]);
        let paths: Vec<_> = nav_items(&employee).iter().map(|i| i.path).collect();
        assert_eq!(paths, vec![EMPLOYEE_LANDING, "/employee/courses"]);

        let manager = session_with(&["manager"], &["view_team"]);
        let paths: Vec<_> = nav_items(&manager).iter().map(|i| i.path).collect();
        assert_eq!(paths, vec![MANAGER_LANDING, "/manager/team"]);

        let admin = session_with(&["admin"], &[]);
        let items = nav_items(&admin);
        assert!(items.iter().any(|i| i.path == "/admin/roles"));
        assert!(items.iter().any(|i| i.path == "/manager/assignments"));
        assert!(items.iter().any(|i| i.path == "/employee/career-path"));

        assert!(nav_items(&Session::anonymous()).is_empty());
    }
}
