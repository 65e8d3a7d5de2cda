//! `lmsgate-core`: identifiers and the error taxonomy shared by every
//! lmsgate crate.
//!
//! This crate contains no IO and no authorization policy.

pub mod error;
pub mod id;

pub use error::{AccessError, AccessResult};
pub use id::{EmployeeId, PermissionId, RoleId, UserId};
