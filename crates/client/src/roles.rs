//! Role service over HTTP.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;

use lmsgate_auth::Permission;
use lmsgate_core::{EmployeeId, RoleId};
use lmsgate_roles::{EmployeePage, EmployeeQuery, Role, RolePayload, RoleService, ServiceError};

use crate::http::ApiClient;

#[derive(Serialize)]
struct Reassignment {
    reassign_to_id: RoleId,
}

#[derive(Serialize)]
struct Assignment {
    employee_id: EmployeeId,
    role_id: RoleId,
}

#[derive(Debug, Clone)]
pub struct HttpRoleService {
    api: ApiClient,
}

impl HttpRoleService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RoleService for HttpRoleService {
    async fn list_roles(&self) -> Result<Vec<Role>, ServiceError> {
        Ok(self.api.get_data("/roles").await?)
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, ServiceError> {
        Ok(self.api.get_data("/roles/permissions").await?)
    }

    async fn create_role(&self, payload: &RolePayload) -> Result<(), ServiceError> {
        Ok(self.api.send_json(Method::POST, "/roles", payload).await?)
    }

    async fn update_role(&self, id: RoleId, payload: &RolePayload) -> Result<(), ServiceError> {
        let path = format!("/roles/{id}");
        Ok(self.api.send_json(Method::PUT, &path, payload).await?)
    }

    async fn delete_role(&self, id: RoleId, reassign_to: RoleId) -> Result<(), ServiceError> {
        let path = format!("/roles/{id}");
        let body = Reassignment {
            reassign_to_id: reassign_to,
        };
        Ok(self.api.send_json(Method::DELETE, &path, &body).await?)
    }

    async fn list_employees(&self, query: &EmployeeQuery) -> Result<EmployeePage, ServiceError> {
        Ok(self.api.get_query("/roles/users", query).await?)
    }

    async fn assign_role(&self, employee: EmployeeId, role: RoleId) -> Result<(), ServiceError> {
        let body = Assignment {
            employee_id: employee,
            role_id: role,
        };
        Ok(self.api.send_json(Method::POST, "/roles/assign", &body).await?)
    }
}
