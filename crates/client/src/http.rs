//! Shared HTTP transport.
//!
//! A `401` clears the persisted token (and the attached session, if any)
//! and sends the user to sign-in; a `403` sends them to the unauthorized
//! page. Both happen here, for every call, before the error reaches the
//! caller.

use std::sync::{Arc, OnceLock, Weak};

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use lmsgate_auth::navigation::{SIGN_IN_PATH, UNAUTHORIZED_PATH};
use lmsgate_auth::{IdentityError, Navigator, SessionStore, TokenStore};
use lmsgate_roles::ServiceError;

use crate::config::ClientConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Api { status: u16, message: Option<String> },
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<ApiError> for ServiceError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(e) => Self::Transport(e),
            ApiError::Api { status, message } => Self::Rejected { status, message },
            ApiError::Parse(e) => Self::Malformed(e),
        }
    }
}

impl From<ApiError> for IdentityError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(e) => Self::Transport(e),
            ApiError::Api { status, .. } => Self::Rejected { status },
            ApiError::Parse(e) => Self::Malformed(e),
        }
    }
}

/// List endpoints wrap their payload as `{ "data": ... }`.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    session: Arc<OnceLock<Weak<SessionStore>>>,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            tokens,
            navigator,
            session: Arc::new(OnceLock::new()),
        })
    }

    /// Let a `401` also clear `session`. Only the first call takes effect.
    pub fn attach_session(&self, session: &Arc<SessionStore>) {
        let _ = self.session.set(Arc::downgrade(session));
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send with the persisted token.
    pub async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        self.send_as(req, self.tokens.get()).await
    }

    /// Send with an explicit token (or none).
    pub async fn send_as(
        &self,
        req: RequestBuilder,
        token: Option<String>,
    ) -> Result<Response, ApiError> {
        let req = match token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let resp = req.send().await.map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        match status {
            StatusCode::UNAUTHORIZED => self.on_unauthorized(),
            StatusCode::FORBIDDEN => {
                tracing::info!("request forbidden");
                self.navigator.replace(UNAUTHORIZED_PATH);
            }
            _ => {}
        }

        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::Api {
            status: status.as_u16(),
            message: server_message(&body),
        })
    }

    fn on_unauthorized(&self) {
        tracing::warn!("request unauthorized; clearing session");
        match self.session.get().and_then(Weak::upgrade) {
            Some(session) => session.expire_session(),
            None => self.tokens.clear(),
        }
        self.navigator.replace(SIGN_IN_PATH);
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.send(self.request(Method::GET, path)).await?;
        parse(resp).await
    }

    pub async fn get_query<Q, T>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.send(self.request(Method::GET, path).query(query)).await?;
        parse(resp).await
    }

    /// `GET` a `{ "data": ... }` envelope and unwrap it.
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.get_json(path).await?;
        Ok(envelope.data)
    }

    /// Send `body` as JSON, discarding the response body.
    pub async fn send_json<B>(&self, method: Method, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.send(self.request(method, path).json(body)).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

async fn parse<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    resp.json().await.map_err(|e| ApiError::Parse(e.to_string()))
}

/// The `message` field of a JSON error body, if there is one.
fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
