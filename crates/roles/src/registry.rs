//! Role lifecycle: list, create, update, and delete-with-reassignment.
//!
//! The registry does not check the caller's permissions. Call sites gate
//! their affordances with [`actions_for`] and the role service enforces.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lmsgate_auth::permissions::keys;
use lmsgate_auth::{Permission, Session};
use lmsgate_core::{AccessError, AccessResult, RoleId};

use crate::model::{Role, RoleForm};
use crate::service::RoleService;

const LOAD_FAILED: &str = "Failed to load data.";
const CREATE_FAILED: &str = "Failed to create role.";
const UPDATE_FAILED: &str = "Failed to update role.";
const DELETE_FAILED: &str = "Failed to delete role.";

/// What the role list screen renders from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryState {
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Per-role affordances for the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleActions {
    pub edit: bool,
    pub delete: bool,
}

pub fn actions_for(session: &Session, role: &Role) -> RoleActions {
    let edit = session.can(&keys::ROLE_EDIT);
    RoleActions {
        edit,
        delete: edit && !role.is_system_role,
    }
}

/// Releases the saving flag when the mutation ends, however it ends.
pub(crate) struct SavingGuard<'a>(&'a AtomicBool);

impl<'a> SavingGuard<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> AccessResult<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| AccessError::validation("another change is already being saved"))?;
        Ok(Self(flag))
    }
}

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct RoleRegistry {
    service: Arc<dyn RoleService>,
    state: RwLock<RegistryState>,
    saving: AtomicBool,
}

impl RoleRegistry {
    pub fn new(service: Arc<dyn RoleService>) -> Self {
        Self {
            service,
            state: RwLock::new(RegistryState::default()),
            saving: AtomicBool::new(false),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> RegistryState {
        self.read().clone()
    }

    pub fn roles(&self) -> Vec<Role> {
        self.read().roles.clone()
    }

    pub fn permissions(&self) -> Vec<Permission> {
        self.read().permissions.clone()
    }

    pub fn role(&self, id: RoleId) -> Option<Role> {
        self.read().roles.iter().find(|r| r.id == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn load_error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Every role a deleted role's holders may be moved to.
    pub fn reassignment_targets(&self, id: RoleId) -> Vec<Role> {
        self.read()
            .roles
            .iter()
            .filter(|r| r.id != id)
            .cloned()
            .collect()
    }

    /// Fetch roles and the permission catalogue together.
    ///
    /// On failure the previous lists stay in place and the error is kept
    /// for display.
    pub async fn refresh(&self) -> AccessResult<()> {
        self.write().loading = true;

        let result = tokio::try_join!(self.service.list_roles(), self.service.list_permissions());

        let mut state = self.write();
        state.loading = false;
        match result {
            Ok((roles, permissions)) => {
                tracing::debug!(
                    roles = roles.len(),
                    permissions = permissions.len(),
                    "role registry loaded"
                );
                state.roles = roles;
                state.permissions = permissions;
                state.error = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "role registry load failed");
                let err = err.into_access(LOAD_FAILED);
                state.error = Some(err.user_message().to_string());
                Err(err)
            }
        }
    }

    pub async fn create(&self, form: &RoleForm) -> AccessResult<()> {
        let payload = form.to_payload()?;
        let _saving = SavingGuard::acquire(&self.saving)?;

        self.service
            .create_role(&payload)
            .await
            .map_err(|e| e.into_access(CREATE_FAILED))?;

        tracing::info!(name = ?payload.name, "role created");
        self.refresh_after_write().await;
        Ok(())
    }

    /// Submit an edit. The name is never sent for a system role, whether
    /// the form or the cached role says so.
    pub async fn update(&self, id: RoleId, form: &RoleForm) -> AccessResult<()> {
        let cached_system = self.role(id).is_some_and(|r| r.is_system_role);
        let payload = if cached_system {
            form.clone().with_fixed_name().to_payload()?
        } else {
            form.to_payload()?
        };
        let _saving = SavingGuard::acquire(&self.saving)?;

        self.service
            .update_role(id, &payload)
            .await
            .map_err(|e| e.into_access(UPDATE_FAILED))?;

        tracing::info!(role_id = %id, "role updated");
        self.refresh_after_write().await;
        Ok(())
    }

    /// Delete `id`, moving its holders to `reassign_to` in the same server
    /// call. Nothing is sent unless a distinct target is given.
    pub async fn delete(&self, id: RoleId, reassign_to: Option<RoleId>) -> AccessResult<()> {
        let Some(target) = reassign_to else {
            return Err(AccessError::validation(
                "Please select a role to reassign employees to.",
            ));
        };
        if target == id {
            return Err(AccessError::validation(
                "Employees cannot be reassigned to the role being deleted.",
            ));
        }
        if self.role(id).is_some_and(|r| r.is_system_role) {
            return Err(AccessError::validation("System roles cannot be deleted."));
        }
        let _saving = SavingGuard::acquire(&self.saving)?;

        self.service
            .delete_role(id, target)
            .await
            .map_err(|e| e.into_access(DELETE_FAILED))?;

        tracing::info!(role_id = %id, reassigned_to = %target, "role deleted");
        self.refresh_after_write().await;
        Ok(())
    }

    async fn refresh_after_write(&self) {
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "role list refresh after write failed");
        }
    }
}

impl core::fmt::Debug for RoleRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoleRegistry")
            .field("state", &*self.read())
            .field("saving", &self.is_saving())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use lmsgate_auth::{MeResponse, PermissionKey, RoleName, SessionUser};
    use lmsgate_core::{EmployeeId, PermissionId, UserId};

    use crate::memory::InMemoryRoleService;
    use crate::model::{EmployeePage, EmployeeQuery, RolePayload};
    use crate::service::ServiceError;

    fn service() -> Arc<InMemoryRoleService> {
        Arc::new(
            InMemoryRoleService::seeded()
                .with_role(4, "trainer", false, &[8])
                .with_employee(10, "Ada", "Lovelace", "ada@example.com", &[(4, true)])
                .with_employee(11, "Alan", "Turing", "alan@example.com", &[(4, true), (3, false)]),
        )
    }

    async fn loaded(svc: &Arc<InMemoryRoleService>) -> RoleRegistry {
        let registry = RoleRegistry::new(svc.clone());
        registry.refresh().await.unwrap();
        registry
    }

    fn session(roles: &[&str], permissions: &[&str]) -> Session {
        Session::from_identity(MeResponse {
            user: SessionUser {
                id: UserId::new(1),
                first_name: "Test".into(),
                last_name: "User".into(),
                email: "test@example.com".into(),
                role: roles.first().map(|r| RoleName::new(r.to_string())),
                roles: Some(roles.iter().map(|r| RoleName::new(r.to_string())).collect()),
            },
            permissions: Some(
                permissions
                    .iter()
                    .map(|p| PermissionKey::new(p.to_string()))
                    .collect(),
            ),
        })
    }

    #[tokio::test]
    async fn refresh_loads_roles_and_catalogue() {
        let svc = service();
        let registry = loaded(&svc).await;

        assert_eq!(registry.roles().len(), 4);
        assert_eq!(registry.permissions().len(), 8);
        assert!(!registry.is_loading());
        assert_eq!(registry.role(RoleId::new(4)).unwrap().employee_count, Some(2));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_lists_and_reports() {
        let svc = service();
        let registry = loaded(&svc).await;

        svc.fail_next(ServiceError::Transport("connection refused".into()));
        let err = registry.refresh().await.unwrap_err();
        assert_eq!(err, AccessError::OperationFailed(LOAD_FAILED.into()));
        assert_eq!(registry.load_error().as_deref(), Some(LOAD_FAILED));
        assert_eq!(registry.roles().len(), 4);
    }

    #[tokio::test]
    async fn delete_without_target_sends_nothing() {
        let svc = service();
        let registry = loaded(&svc).await;
        let before = svc.requests();

        let err = registry.delete(RoleId::new(4), None).await.unwrap_err();
        assert!(err.is_validation());
        let err = registry.delete(RoleId::new(4), Some(RoleId::new(4))).await.unwrap_err();
        assert!(err.is_validation());
        let err = registry.delete(RoleId::new(1), Some(RoleId::new(3))).await.unwrap_err();
        assert!(err.is_validation());

        assert_eq!(svc.requests(), before);
    }

    #[tokio::test]
    async fn delete_with_target_refetches_authoritative_list() {
        let svc = service();
        let registry = loaded(&svc).await;

        registry.delete(RoleId::new(4), Some(RoleId::new(3))).await.unwrap();

        assert!(registry.role(RoleId::new(4)).is_none());
        assert_eq!(registry.role(RoleId::new(3)).unwrap().employee_count, Some(2));
        assert_eq!(svc.employee_roles(EmployeeId::new(11)), vec![(RoleId::new(3), true)]);
    }

    #[tokio::test]
    async fn duplicate_name_surfaces_server_message() {
        let svc = service();
        let registry = loaded(&svc).await;

        let err = registry
            .create(&RoleForm::for_create().with_name("Trainer"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AccessError::OperationFailed("A role with this name already exists.".into())
        );
        assert!(!registry.is_saving());
    }

    #[tokio::test]
    async fn create_falls_back_to_generic_message() {
        let svc = service();
        let registry = loaded(&svc).await;

        svc.fail_next(ServiceError::Rejected { status: 500, message: None });
        let err = registry
            .create(&RoleForm::for_create().with_name("Auditor"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), CREATE_FAILED);
    }

    #[tokio::test]
    async fn refused_write_is_forbidden_not_a_failure() {
        let svc = service();
        let registry = loaded(&svc).await;

        svc.fail_next(ServiceError::rejected(403, "Forbidden"));
        let err = registry
            .delete(RoleId::new(4), Some(RoleId::new(3)))
            .await
            .unwrap_err();

        assert_eq!(err, AccessError::Forbidden("Forbidden".to_string()));
        assert!(registry.role(RoleId::new(4)).is_some());
        assert!(!registry.is_saving());
    }

    #[tokio::test]
    async fn create_then_update_round_trips() {
        let svc = service();
        let registry = loaded(&svc).await;

        registry
            .create(
                &RoleForm::for_create()
                    .with_name(" Auditor ")
                    .with_permissions([PermissionId::new(1)]),
            )
            .await
            .unwrap();
        let created = registry.roles().into_iter().find(|r| r.name.as_str() == "Auditor").unwrap();
        assert_eq!(created.permissions.len(), 1);

        let mut form = RoleForm::from_role(&created).with_description("reads everything");
        form.toggle_permission(PermissionId::new(8));
        registry.update(created.id, &form).await.unwrap();

        let updated = registry.role(created.id).unwrap();
        assert_eq!(updated.description.as_deref(), Some("reads everything"));
        assert_eq!(updated.permissions.len(), 2);
    }

    #[tokio::test]
    async fn system_role_update_never_sends_a_name() {
        let svc = service();
        let registry = loaded(&svc).await;

        // The form claims a renamable role; the cached role says otherwise.
        let form = RoleForm::for_create()
            .with_name("superuser")
            .with_permissions([PermissionId::new(1)]);
        registry.update(RoleId::new(1), &form).await.unwrap();

        let admin = registry.role(RoleId::new(1)).unwrap();
        assert_eq!(admin.name.as_str(), "admin");
        assert_eq!(admin.permissions.len(), 1);
    }

    #[tokio::test]
    async fn non_system_update_requires_a_name() {
        let svc = service();
        let registry = loaded(&svc).await;
        let before = svc.requests();

        let trainer = registry.role(RoleId::new(4)).unwrap();
        let form = RoleForm::from_role(&trainer).with_name("  ");
        assert!(registry.update(trainer.id, &form).await.unwrap_err().is_validation());
        assert_eq!(svc.requests(), before);
    }

    struct GatedCreate {
        inner: Arc<InMemoryRoleService>,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl RoleService for GatedCreate {
        async fn list_roles(&self) -> Result<Vec<Role>, ServiceError> {
            self.inner.list_roles().await
        }
        async fn list_permissions(&self) -> Result<Vec<Permission>, ServiceError> {
            self.inner.list_permissions().await
        }
        async fn create_role(&self, payload: &RolePayload) -> Result<(), ServiceError> {
            self.gate.notified().await;
            self.inner.create_role(payload).await
        }
        async fn update_role(&self, id: RoleId, payload: &RolePayload) -> Result<(), ServiceError> {
            self.inner.update_role(id, payload).await
        }
        async fn delete_role(&self, id: RoleId, reassign_to: RoleId) -> Result<(), ServiceError> {
            self.inner.delete_role(id, reassign_to).await
        }
        async fn list_employees(
            &self,
            query: &EmployeeQuery,
        ) -> Result<EmployeePage, ServiceError> {
            self.inner.list_employees(query).await
        }
        async fn assign_role(
            &self,
            employee: EmployeeId,
            role: RoleId,
        ) -> Result<(), ServiceError> {
            self.inner.assign_role(employee, role).await
        }
    }

    #[tokio::test]
    async fn second_mutation_is_refused_while_saving() {
        let gate = Arc::new(Notify::new());
        let registry = RoleRegistry::new(Arc::new(GatedCreate {
            inner: service(),
            gate: gate.clone(),
        }));

        let first = RoleForm::for_create().with_name("Auditor");
        let second = RoleForm::for_create().with_name("Reviewer");
        let (a, b, ()) = tokio::join!(registry.create(&first), registry.create(&second), async {
            tokio::task::yield_now().await;
            gate.notify_one();
        });

        assert!(a.is_ok());
        assert_eq!(
            b.unwrap_err(),
            AccessError::validation("another change is already being saved")
        );
        assert!(!registry.is_saving());
        assert_eq!(registry.roles().len(), 5);
    }

    #[test]
    fn actions_follow_role_edit_and_system_flag() {
        let admin = Role {
            id: RoleId::new(1),
            name: RoleName::ADMIN,
            description: None,
            is_system_role: true,
            permissions: vec![],
            employee_count: None,
        };
        let trainer = Role {
            id: RoleId::new(4),
            name: RoleName::new("trainer"),
            is_system_role: false,
            ..admin.clone()
        };

        let editor = session(&["manager"], &["role_view", "role_edit"]);
        assert_eq!(actions_for(&editor, &admin), RoleActions { edit: true, delete: false });
        assert_eq!(actions_for(&editor, &trainer), RoleActions { edit: true, delete: true });

        let viewer = session(&["manager"], &["role_view"]);
        assert_eq!(actions_for(&viewer, &trainer), RoleActions { edit: false, delete: false });

        let superuser = session(&["admin"], &[]);
        assert!(actions_for(&superuser, &trainer).delete);
    }

    #[tokio::test]
    async fn reassignment_targets_exclude_the_deleted_role() {
        let svc = service();
        let registry = loaded(&svc).await;
        let targets = registry.reassignment_targets(RoleId::new(4));
        assert_eq!(targets.len(), 3);
        assert!(targets.iter().all(|r| r.id != RoleId::new(4)));
    }
}
