//! Wiring of the portal's services around one HTTP client.

use std::sync::Arc;

use lmsgate_auth::navigation::{NavItem, nav_items};
use lmsgate_auth::{Navigator, Resolution, RouteTable, SessionStore, TokenStore};
use lmsgate_roles::{AssignmentDirectory, RoleRegistry};

use crate::callback;
use crate::config::ClientConfig;
use crate::http::{ApiClient, ApiError};
use crate::identity::HttpIdentityService;
use crate::navigator::ChannelNavigator;
use crate::roles::HttpRoleService;

#[derive(Debug)]
pub struct Portal {
    config: ClientConfig,
    navigator: Arc<ChannelNavigator>,
    identity: Arc<HttpIdentityService>,
    roles: Arc<HttpRoleService>,
    session: Arc<SessionStore>,
    routes: RouteTable,
}

impl Portal {
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let navigator = Arc::new(ChannelNavigator::new());
        let api = ApiClient::new(&config, tokens.clone(), navigator.clone())?;

        let identity = Arc::new(HttpIdentityService::new(api.clone()));
        let roles = Arc::new(HttpRoleService::new(api.clone()));
        let session = Arc::new(SessionStore::new(identity.clone(), tokens));
        api.attach_session(&session);

        Ok(Self {
            config,
            navigator,
            identity,
            roles,
            session,
            routes: RouteTable::portal(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<ChannelNavigator> {
        &self.navigator
    }

    pub fn role_registry(&self) -> RoleRegistry {
        RoleRegistry::new(self.roles.clone())
    }

    pub fn assignment_directory(&self) -> AssignmentDirectory {
        AssignmentDirectory::new(self.roles.clone())
            .with_session(self.session.clone())
            .with_page_size(self.config.page_size)
            .with_debounce(self.config.search_debounce)
    }

    pub async fn sign_in_url(&self) -> Result<String, ApiError> {
        self.identity.sign_in_url().await
    }

    /// Handle the sign-in callback and navigate to where it leads.
    pub async fn complete_sign_in(&self, callback_url: &str) -> &'static str {
        let path = callback::complete_sign_in(&self.session, callback_url).await;
        self.navigator.replace(path);
        path
    }

    /// Resolve `path` against the current session, following any redirect.
    pub fn open(&self, path: &str) -> Resolution {
        let resolution = self.routes.resolve(path, &self.session.snapshot());
        if let Resolution::Replace(target) = &resolution {
            self.navigator.replace(target);
        }
        resolution
    }

    pub fn menu(&self) -> Vec<NavItem> {
        nav_items(&self.session.snapshot())
    }
}
