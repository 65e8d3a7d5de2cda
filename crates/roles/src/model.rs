//! Role directory records, as exchanged with the role service.

use serde::{Deserialize, Serialize};

use lmsgate_auth::{Permission, RoleName};
use lmsgate_core::{AccessError, AccessResult, EmployeeId, PermissionId, RoleId};

/// A role definition with its resolved permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,

    #[serde(default)]
    pub description: Option<String>,

    /// Built-in roles (`admin`, `manager`, `employee`). Their name is fixed
    /// and they can never be deleted.
    #[serde(default)]
    pub is_system_role: bool,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// Number of employees currently holding this role.
    #[serde(default)]
    pub employee_count: Option<u64>,
}

/// Body of `POST /roles` and `PUT /roles/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePayload {
    /// Omitted entirely for system roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub description: String,
    pub permissions: Vec<PermissionId>,
}

/// Editing surface for a role (create and edit share it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleForm {
    pub name: String,
    pub description: String,
    selected: Vec<PermissionId>,
    system: bool,
}

impl RoleForm {
    pub fn for_create() -> Self {
        Self::default()
    }

    pub fn from_role(role: &Role) -> Self {
        Self {
            name: role.name.as_str().to_string(),
            description: role.description.clone().unwrap_or_default(),
            selected: role.permissions.iter().map(|p| p.id).collect(),
            system: role.is_system_role,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_permissions(mut self, ids: impl IntoIterator<Item = PermissionId>) -> Self {
        for id in ids {
            if !self.selected.contains(&id) {
                self.selected.push(id);
            }
        }
        self
    }

    /// The name input is disabled for system roles.
    pub fn name_editable(&self) -> bool {
        !self.system
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    /// Treat the form as editing a system role: the name is no longer sent.
    pub(crate) fn with_fixed_name(mut self) -> Self {
        self.system = true;
        self
    }

    pub fn selected_permissions(&self) -> &[PermissionId] {
        &self.selected
    }

    pub fn is_selected(&self, id: PermissionId) -> bool {
        self.selected.contains(&id)
    }

    pub fn toggle_permission(&mut self, id: PermissionId) {
        if let Some(pos) = self.selected.iter().position(|p| *p == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id);
        }
    }

    /// Payload for submission. The name is trimmed and required unless the
    /// role is a system role, in which case it is not sent at all.
    pub fn to_payload(&self) -> AccessResult<RolePayload> {
        let name = if self.system {
            None
        } else {
            let trimmed = self.name.trim();
            if trimmed.is_empty() {
                return Err(AccessError::validation("Role name is required."));
            }
            Some(trimmed.to_string())
        };

        Ok(RolePayload {
            name,
            description: self.description.trim().to_string(),
            permissions: self.selected.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub name: String,
}

/// The join row between an employee and a role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRoleLink {
    #[serde(default)]
    pub is_primary: bool,
}

/// A role as attached to an employee in the directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedRole {
    pub id: RoleId,
    pub name: RoleName,

    #[serde(rename = "EmployeeRole", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<EmployeeRoleLink>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
}

impl AssignedRole {
    pub fn new(id: RoleId, name: RoleName, is_primary: bool) -> Self {
        Self {
            id,
            name,
            link: Some(EmployeeRoleLink { is_primary }),
            is_primary: None,
        }
    }

    /// The primary marker may arrive flat or nested in the join row.
    pub fn is_primary(&self) -> bool {
        self.is_primary
            .or(self.link.map(|l| l.is_primary))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub employee_number: Option<String>,

    #[serde(default, alias = "Department")]
    pub department: Option<Department>,

    #[serde(default)]
    pub roles: Vec<AssignedRole>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn primary_role(&self) -> Option<&AssignedRole> {
        self.roles.iter().find(|r| r.is_primary())
    }

    /// Role to pre-select when editing: the primary role, else the first.
    pub fn preselected_role(&self) -> Option<RoleId> {
        self.primary_role().or(self.roles.first()).map(|r| r.id)
    }

    /// Roles in badge order: the primary role first, the rest as listed.
    pub fn badges(&self) -> Vec<&AssignedRole> {
        let mut roles: Vec<&AssignedRole> = self.roles.iter().collect();
        roles.sort_by_key(|r| !r.is_primary());
        roles
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub pages: u32,
    pub total: u64,
}

impl Default for PageMeta {
    fn default() -> Self {
        Self { page: 1, pages: 1, total: 0 }
    }
}

/// Body of `GET /roles/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeePage {
    #[serde(default)]
    pub data: Vec<Employee>,

    #[serde(default)]
    pub meta: Option<PageMeta>,
}

/// Query string of `GET /roles/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeQuery {
    pub page: u32,
    pub limit: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<RoleId>,
}
