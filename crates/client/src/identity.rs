//! Identity service over HTTP.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use lmsgate_auth::{IdentityError, IdentityService, MeResponse};

use crate::http::{ApiClient, ApiError};

#[derive(Debug, Deserialize)]
struct SignInStart {
    #[serde(rename = "authUrl")]
    auth_url: String,
}

#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    api: ApiClient,
}

impl HttpIdentityService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Where to send the browser to start single sign-on.
    pub async fn sign_in_url(&self) -> Result<String, ApiError> {
        let start: SignInStart = self.api.get_json("/auth/microsoft/login").await?;
        Ok(start.auth_url)
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn current_user(&self) -> Result<MeResponse, IdentityError> {
        Ok(self.api.get_json("/auth/me").await?)
    }

    /// The local token is already gone by now, so the one being retired is
    /// passed in explicitly.
    async fn logout(&self, token: Option<String>) -> Result<(), IdentityError> {
        self.api
            .send_as(self.api.request(Method::POST, "/auth/logout"), token)
            .await?;
        Ok(())
    }
}
