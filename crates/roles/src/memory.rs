//! In-memory role service.
//!
//! Intended for tests/dev. Enforces the same rules as the real service:
//! case-insensitive unique names, fixed system role names, atomic
//! reassign-then-delete, exactly one primary role per employee.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;

use lmsgate_auth::{Permission, PermissionKey, RoleName};
use lmsgate_core::{EmployeeId, PermissionId, RoleId};

use crate::model::{
    AssignedRole, Department, Employee, EmployeePage, EmployeeQuery, PageMeta, Role, RolePayload,
};
use crate::service::{RoleService, ServiceError};

#[derive(Debug, Clone)]
struct StoredRole {
    name: String,
    description: Option<String>,
    is_system: bool,
    permissions: Vec<PermissionId>,
}

#[derive(Debug, Clone)]
struct StoredEmployee {
    first_name: String,
    last_name: String,
    email: String,
    employee_number: Option<String>,
    department: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
    employee: EmployeeId,
    role: RoleId,
    is_primary: bool,
}

#[derive(Debug, Default)]
struct Directory {
    permissions: Vec<Permission>,
    roles: BTreeMap<RoleId, StoredRole>,
    employees: BTreeMap<EmployeeId, StoredEmployee>,
    links: Vec<Link>,
    last_query: Option<EmployeeQuery>,
}

impl Directory {
    fn name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        self.roles
            .iter()
            .any(|(id, r)| Some(*id) != except && r.name.eq_ignore_ascii_case(name))
    }

    fn check_permissions(&self, ids: &[PermissionId]) -> Result<(), ServiceError> {
        match ids.iter().find(|id| !self.permissions.iter().any(|p| p.id == **id)) {
            Some(unknown) => Err(ServiceError::rejected(
                400,
                format!("Unknown permission {unknown}."),
            )),
            None => Ok(()),
        }
    }

    fn render_role(&self, id: RoleId, role: &StoredRole) -> Role {
        Role {
            id,
            name: RoleName::new(role.name.clone()),
            description: role.description.clone(),
            is_system_role: role.is_system,
            permissions: self
                .permissions
                .iter()
                .filter(|p| role.permissions.contains(&p.id))
                .cloned()
                .collect(),
            employee_count: Some(self.links.iter().filter(|l| l.role == id).count() as u64),
        }
    }

    fn render_employee(&self, id: EmployeeId, e: &StoredEmployee) -> Employee {
        Employee {
            id,
            first_name: e.first_name.clone(),
            last_name: e.last_name.clone(),
            email: e.email.clone(),
            employee_number: e.employee_number.clone(),
            department: e.department.clone().map(|name| Department { name }),
            roles: self
                .links
                .iter()
                .filter(|l| l.employee == id)
                .filter_map(|l| {
                    let role = self.roles.get(&l.role)?;
                    Some(AssignedRole::new(l.role, RoleName::new(role.name.clone()), l.is_primary))
                })
                .collect(),
        }
    }

    fn matches(&self, id: EmployeeId, e: &StoredEmployee, query: &EmployeeQuery) -> bool {
        if let Some(role) = query.role_id {
            if !self.links.iter().any(|l| l.employee == id && l.role == role) {
                return false;
            }
        }

        let needle = query.search.as_deref().map(str::trim).unwrap_or("").to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let full_name = format!("{} {}", e.first_name, e.last_name).to_lowercase();
        full_name.contains(&needle)
            || e.email.to_lowercase().contains(&needle)
            || e
                .employee_number
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRoleService {
    directory: RwLock<Directory>,
    requests: AtomicUsize,
    fail_next: Mutex<Option<ServiceError>>,
}

impl InMemoryRoleService {
    pub fn new() -> Self {
        Self::default()
    }

    /// The portal's standard catalogue and the three system roles
    /// (`admin` = 1, `manager` = 2, `employee` = 3).
    pub fn seeded() -> Self {
        let catalogue = [
            (1, "role_view", "View roles"),
            (2, "role_edit", "Edit roles"),
            (3, "user_edit", "Assign roles"),
            (4, "view_own_courses", "My courses"),
            (5, "view_team", "View team"),
            (6, "manage_roles", "Manage roles"),
            (7, "manage_employees", "Manage employees"),
            (8, "course_view", "View courses"),
        ];
        let mut service = Self::new();
        for (id, key, label) in catalogue {
            service = service.with_permission(id, key, label);
        }
        service
            .with_role(1, "admin", true, &[1, 2, 3, 6, 7])
            .with_role(2, "manager", true, &[1, 4, 5, 8])
            .with_role(3, "employee", true, &[4, 8])
    }

    fn directory_mut(&mut self) -> &mut Directory {
        self.directory.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_permission(mut self, id: i64, key: &str, label: &str) -> Self {
        self.directory_mut().permissions.push(Permission {
            id: PermissionId::new(id),
            key: PermissionKey::new(key.to_string()),
            label: label.to_string(),
            description: None,
        });
        self
    }

    pub fn with_role(mut self, id: i64, name: &str, is_system: bool, permissions: &[i64]) -> Self {
        self.directory_mut().roles.insert(
            RoleId::new(id),
            StoredRole {
                name: name.to_string(),
                description: None,
                is_system,
                permissions: permissions.iter().copied().map(PermissionId::new).collect(),
            },
        );
        self
    }

    /// Add an employee holding `roles` (`(role id, is primary)`).
    pub fn with_employee(
        mut self,
        id: i64,
        first_name: &str,
        last_name: &str,
        email: &str,
        roles: &[(i64, bool)],
    ) -> Self {
        let employee = EmployeeId::new(id);
        let dir = self.directory_mut();
        dir.employees.insert(
            employee,
            StoredEmployee {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                employee_number: Some(format!("E{id:04}")),
                department: None,
            },
        );
        dir.links.extend(roles.iter().map(|(role, is_primary)| Link {
            employee,
            role: RoleId::new(*role),
            is_primary: *is_primary,
        }));
        self
    }

    /// Number of service calls received so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Make the next call fail with `err`.
    pub fn fail_next(&self, err: ServiceError) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    pub fn last_employee_query(&self) -> Option<EmployeeQuery> {
        self.read().last_query.clone()
    }

    /// `(role, is_primary)` rows for one employee.
    pub fn employee_roles(&self, employee: EmployeeId) -> Vec<(RoleId, bool)> {
        self.read()
            .links
            .iter()
            .filter(|l| l.employee == employee)
            .map(|l| (l.role, l.is_primary))
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Directory> {
        self.directory.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Directory> {
        self.directory.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<(), ServiceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.fail_next.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RoleService for InMemoryRoleService {
    async fn list_roles(&self) -> Result<Vec<Role>, ServiceError> {
        self.begin()?;
        let dir = self.read();
        Ok(dir.roles.iter().map(|(id, r)| dir.render_role(*id, r)).collect())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, ServiceError> {
        self.begin()?;
        Ok(self.read().permissions.clone())
    }

    async fn create_role(&self, payload: &RolePayload) -> Result<(), ServiceError> {
        self.begin()?;
        let mut dir = self.write();

        let name = payload.name.as_deref().map(str::trim).unwrap_or("");
        if name.is_empty() {
            return Err(ServiceError::rejected(400, "Role name is required."));
        }
        if dir.name_taken(name, None) {
            return Err(ServiceError::rejected(409, "A role with this name already exists."));
        }
        dir.check_permissions(&payload.permissions)?;

        let id = dir.roles.keys().next_back().map_or(1, |last| last.get() + 1);
        dir.roles.insert(
            RoleId::new(id),
            StoredRole {
                name: name.to_string(),
                description: Some(payload.description.clone()).filter(|d| !d.is_empty()),
                is_system: false,
                permissions: payload.permissions.clone(),
            },
        );
        Ok(())
    }

    async fn update_role(&self, id: RoleId, payload: &RolePayload) -> Result<(), ServiceError> {
        self.begin()?;
        let mut dir = self.write();

        let Some(current) = dir.roles.get(&id) else {
            return Err(ServiceError::rejected(404, "Role not found."));
        };
        let is_system = current.is_system;

        let rename = match payload.name.as_deref().map(str::trim) {
            None => None,
            Some(name) if is_system && name != current.name => {
                return Err(ServiceError::rejected(400, "System role names cannot be changed."));
            }
            Some(_) if is_system => None,
            Some("") => return Err(ServiceError::rejected(400, "Role name is required.")),
            Some(name) if dir.name_taken(name, Some(id)) => {
                return Err(ServiceError::rejected(409, "A role with this name already exists."));
            }
            Some(name) => Some(name.to_string()),
        };
        dir.check_permissions(&payload.permissions)?;

        if let Some(role) = dir.roles.get_mut(&id) {
            if let Some(name) = rename {
                role.name = name;
            }
            role.description = Some(payload.description.clone()).filter(|d| !d.is_empty());
            role.permissions = payload.permissions.clone();
        }
        Ok(())
    }

    async fn delete_role(&self, id: RoleId, reassign_to: RoleId) -> Result<(), ServiceError> {
        self.begin()?;
        let mut dir = self.write();

        if id == reassign_to {
            return Err(ServiceError::rejected(
                400,
                "Employees cannot be reassigned to the role being deleted.",
            ));
        }
        match dir.roles.get(&id) {
            None => return Err(ServiceError::rejected(404, "Role not found.")),
            Some(role) if role.is_system => {
                return Err(ServiceError::rejected(400, "System roles cannot be deleted."));
            }
            Some(_) => {}
        }
        if !dir.roles.contains_key(&reassign_to) {
            return Err(ServiceError::rejected(400, "Reassignment role not found."));
        }

        // Migrate and delete under one lock: callers never observe a
        // half-migrated directory.
        let moving: Vec<Link> = dir.links.iter().filter(|l| l.role == id).copied().collect();
        dir.links.retain(|l| l.role != id);
        for link in moving {
            match dir
                .links
                .iter()
                .position(|l| l.employee == link.employee && l.role == reassign_to)
            {
                Some(i) => dir.links[i].is_primary |= link.is_primary,
                None => dir.links.push(Link { role: reassign_to, ..link }),
            }
        }
        dir.roles.remove(&id);
        Ok(())
    }

    async fn list_employees(&self, query: &EmployeeQuery) -> Result<EmployeePage, ServiceError> {
        self.begin()?;
        let mut dir = self.write();
        dir.last_query = Some(query.clone());

        let limit = query.limit.max(1) as usize;
        let page = query.page.max(1);
        let matching: Vec<Employee> = dir
            .employees
            .iter()
            .filter(|(id, e)| dir.matches(**id, e, query))
            .map(|(id, e)| dir.render_employee(*id, e))
            .collect();

        let total = matching.len();
        let pages = total.div_ceil(limit).max(1);
        let data = matching
            .into_iter()
            .skip((page as usize - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Ok(EmployeePage {
            data,
            meta: Some(PageMeta {
                page,
                pages: pages as u32,
                total: total as u64,
            }),
        })
    }

    async fn assign_role(&self, employee: EmployeeId, role: RoleId) -> Result<(), ServiceError> {
        self.begin()?;
        let mut dir = self.write();

        if !dir.employees.contains_key(&employee) {
            return Err(ServiceError::rejected(404, "Employee not found."));
        }
        if !dir.roles.contains_key(&role) {
            return Err(ServiceError::rejected(404, "Role not found."));
        }

        dir.links
            .retain(|l| !(l.employee == employee && l.is_primary && l.role != role));
        match dir
            .links
            .iter()
            .position(|l| l.employee == employee && l.role == role)
        {
            Some(i) => dir.links[i].is_primary = true,
            None => dir.links.push(Link {
                employee,
                role,
                is_primary: true,
            }),
        }
        Ok(())
    }
}
