//! Employee directory with role assignment.
//!
//! Search text is debounced; the role filter and paging fetch at once. An
//! assignment only changes the acting user's own session when they assign
//! to themselves, and then only through a fresh identity round-trip.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use lmsgate_auth::permissions::keys;
use lmsgate_auth::{Session, SessionStore};
use lmsgate_core::{AccessError, AccessResult, EmployeeId, RoleId};

use crate::model::{Employee, EmployeeQuery, PageMeta};
use crate::registry::SavingGuard;
use crate::service::RoleService;

pub const DEFAULT_PAGE_SIZE: u32 = 15;
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);

const LOAD_FAILED: &str = "Failed to load users.";
const ASSIGN_FAILED: &str = "Failed to assign role.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryState {
    pub employees: Vec<Employee>,
    pub meta: PageMeta,
    pub search: String,
    pub role_filter: Option<RoleId>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct AssignmentDirectory {
    service: Arc<dyn RoleService>,
    session: Option<Arc<SessionStore>>,
    state: RwLock<DirectoryState>,
    search_generation: AtomicU64,
    fetch_generation: AtomicU64,
    page_size: u32,
    debounce: Duration,
    saving: AtomicBool,
}

impl AssignmentDirectory {
    pub fn new(service: Arc<dyn RoleService>) -> Self {
        Self {
            service,
            session: None,
            state: RwLock::new(DirectoryState::default()),
            search_generation: AtomicU64::new(0),
            fetch_generation: AtomicU64::new(0),
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_SEARCH_DEBOUNCE,
            saving: AtomicBool::new(false),
        }
    }

    /// Attach the acting user's session so self-assignments refresh it.
    pub fn with_session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, DirectoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DirectoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> DirectoryState {
        self.read().clone()
    }

    pub fn employees(&self) -> Vec<Employee> {
        self.read().employees.clone()
    }

    pub fn meta(&self) -> PageMeta {
        self.read().meta
    }

    pub fn search(&self) -> String {
        self.read().search.clone()
    }

    pub fn role_filter(&self) -> Option<RoleId> {
        self.read().role_filter
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

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Whether the acting user may change other employees' roles.
    pub fn can_assign(session: &Session) -> bool {
        session.can(&keys::USER_EDIT)
    }

    /// Fetch `page` with the current search text and role filter.
    ///
    /// If a newer fetch starts before this one answers, this answer is
    /// dropped.
    pub async fn fetch(&self, page: u32) -> AccessResult<()> {
        let generation = self.fetch_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = {
            let mut state = self.write();
            state.loading = true;
            let search = state.search.trim();
            EmployeeQuery {
                page: page.max(1),
                limit: self.page_size,
                search: (!search.is_empty()).then(|| search.to_string()),
                role_id: state.role_filter,
            }
        };

        let result = self.service.list_employees(&query).await;

        let mut state = self.write();
        if self.fetch_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(page = query.page, "discarding superseded employee page");
            return Ok(());
        }
        state.loading = false;
        match result {
            Ok(body) => {
                state.meta = body.meta.unwrap_or(PageMeta {
                    page: query.page,
                    ..PageMeta::default()
                });
                state.employees = body.data;
                state.error = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "employee list load failed");
                let err = err.into_access(LOAD_FAILED);
                state.error = Some(err.user_message().to_string());
                Err(err)
            }
        }
    }

    /// Record new search text and fetch page 1 once typing settles.
    ///
    /// Returns `Ok(false)` when a later call superseded this one within the
    /// debounce window; no request was made for it.
    pub async fn set_search(&self, text: impl Into<String>) -> AccessResult<bool> {
        let generation = self.search_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.write().search = text.into();

        tokio::time::sleep(self.debounce).await;
        if self.search_generation.load(Ordering::SeqCst) != generation {
            return Ok(false);
        }
        self.fetch(1).await.map(|()| true)
    }

    pub async fn set_role_filter(&self, role: Option<RoleId>) -> AccessResult<()> {
        self.write().role_filter = role;
        self.fetch(1).await
    }

    /// Fetch `page`, clamped to the pages the last answer reported.
    pub async fn go_to_page(&self, page: u32) -> AccessResult<()> {
        let pages = self.read().meta.pages.max(1);
        self.fetch(page.clamp(1, pages)).await
    }

    /// Drop search text and role filter, cancel any pending search, and
    /// fetch page 1.
    pub async fn clear_filters(&self) -> AccessResult<()> {
        self.search_generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.write();
            state.search.clear();
            state.role_filter = None;
        }
        self.fetch(1).await
    }

    /// Make `role` the employee's primary role.
    ///
    /// The current page is fetched again afterwards. Failures are returned
    /// to the caller and leave the session alone.
    pub async fn assign(&self, employee: EmployeeId, role: Option<RoleId>) -> AccessResult<()> {
        let Some(role) = role else {
            return Err(AccessError::validation("Please select a role."));
        };
        let _saving = SavingGuard::acquire(&self.saving)?;

        self.service
            .assign_role(employee, role)
            .await
            .map_err(|e| e.into_access(ASSIGN_FAILED))?;
        tracing::info!(employee_id = %employee, role_id = %role, "role assigned");

        let page = self.read().meta.page;
        if let Err(err) = self.fetch(page).await {
            tracing::warn!(error = %err, "employee list refresh after assignment failed");
        }

        if let Some(session) = &self.session {
            let is_self = session
                .user()
                .is_some_and(|user| EmployeeId::from(user.id) == employee);
            if is_self {
                tracing::info!("own role changed; refreshing session");
                session.refresh_user().await;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for AssignmentDirectory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AssignmentDirectory")
            .field("state", &*self.read())
            .field("page_size", &self.page_size)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}
