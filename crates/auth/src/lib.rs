//! `lmsgate-auth`: the portal's session and permission model.
//!
//! Token inspection, the session store, the authorization predicate and the
//! route guard. Transport lives behind the [`IdentityService`] and
//! [`TokenStore`] seams; this crate never speaks HTTP.

pub mod authorize;
pub mod guard;
pub mod navigation;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod token;
pub mod user;

pub use authorize::{Decision, Rule, can, explain, has_any_role};
pub use guard::{GuardOutcome, RouteGuard};
pub use navigation::{Navigator, Redirect, Resolution, RouteTable, UnauthorizedReason, landing_path};
pub use permissions::{Permission, PermissionKey};
pub use roles::RoleName;
pub use session::{
    IdentityError, IdentityService, MemoryTokenStore, Session, SessionState, SessionStore,
    TokenStore,
};
pub use token::{TokenClaims, TokenError};
pub use user::{MeResponse, SessionUser};
