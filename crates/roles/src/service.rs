use async_trait::async_trait;
use thiserror::Error;

use lmsgate_auth::Permission;
use lmsgate_core::{AccessError, EmployeeId, RoleId};

use crate::model::{EmployeePage, EmployeeQuery, Role, RolePayload};

const FORBIDDEN_FALLBACK: &str = "You don't have permission to perform this action.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Non-success status, with the server's message when it sent one.
    #[error("role service answered {status}")]
    Rejected { status: u16, message: Option<String> },

    #[error("role service unreachable: {0}")]
    Transport(String),

    #[error("unexpected role service response: {0}")]
    Malformed(String),
}

impl ServiceError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: Some(message.into()),
        }
    }

    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Surface to the caller, preferring the server's wording. A `403` is
    /// `Forbidden`; every other failure is `OperationFailed` with `fallback`
    /// standing in for a missing message.
    pub fn into_access(self, fallback: &str) -> AccessError {
        match self {
            Self::Rejected { status: 403, message } => AccessError::forbidden(
                message
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(FORBIDDEN_FALLBACK),
            ),
            other => AccessError::operation_failed(other.server_message(), fallback),
        }
    }
}

/// The remote role/permission service.
///
/// Authorization is enforced by the service, not by callers of this trait.
#[async_trait]
pub trait RoleService: Send + Sync {
    /// `GET /roles`
    async fn list_roles(&self) -> Result<Vec<Role>, ServiceError>;

    /// `GET /roles/permissions`
    async fn list_permissions(&self) -> Result<Vec<Permission>, ServiceError>;

    /// `POST /roles`. Duplicate names (case-insensitive) are rejected here.
    async fn create_role(&self, payload: &RolePayload) -> Result<(), ServiceError>;

    /// `PUT /roles/:id`
    async fn update_role(&self, id: RoleId, payload: &RolePayload) -> Result<(), ServiceError>;

    /// `DELETE /roles/:id` with `{reassign_to_id}`.
    ///
    /// One call, one server-side transaction: every employee holding `id` is
    /// moved to `reassign_to` before the role is removed.
    async fn delete_role(&self, id: RoleId, reassign_to: RoleId) -> Result<(), ServiceError>;

    /// `GET /roles/users?page&limit&search&role_id`
    async fn list_employees(&self, query: &EmployeeQuery) -> Result<EmployeePage, ServiceError>;

    /// `POST /roles/assign`
    async fn assign_role(&self, employee: EmployeeId, role: RoleId) -> Result<(), ServiceError>;
}
