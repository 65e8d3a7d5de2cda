//! `lmsgate-roles`: role lifecycle management and user-role assignment.
//!
//! Everything here mutates server-side role data through a [`RoleService`].
//! The server stays authoritative: after every successful write the cached
//! lists are re-fetched instead of patched locally. None of these
//! operations touch the acting user's session, except an explicit refresh
//! after a self-targeted assignment.

pub mod assignment;
pub mod memory;
pub mod model;
pub mod registry;
pub mod service;

pub use assignment::{AssignmentDirectory, DirectoryState};
pub use memory::InMemoryRoleService;
pub use model::{
    AssignedRole, Department, Employee, EmployeePage, EmployeeQuery, PageMeta, Role, RoleForm,
    RolePayload,
};
pub use registry::{RegistryState, RoleActions, RoleRegistry};
pub use service::{RoleService, ServiceError};
