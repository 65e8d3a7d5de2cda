//! Access error model.

use thiserror::Error;

/// Result type used by session, registry and assignment operations.
pub type AccessResult<T> = Result<T, AccessError>;

/// Everything that can go wrong between the portal and its identity/role
/// services, as seen by the calling UI code.
///
/// `TokenInvalid` and `AuthRejected` are absorbed by the session store and
/// never returned from its public operations; they exist so the store can
/// log and reason about why a session ended up anonymous.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The persisted token could not be decoded or is locally expired.
    #[error("token invalid: {0}")]
    TokenInvalid(String),

    /// The identity service refused the token.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    /// Authenticated, but a role or permission check failed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A client-side precondition failed; no request was sent.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The server rejected a call. The message is user-facing.
    #[error("{0}")]
    OperationFailed(String),
}

impl AccessError {
    pub fn token_invalid(msg: impl Into<String>) -> Self {
        Self::TokenInvalid(msg.into())
    }

    pub fn auth_rejected(msg: impl Into<String>) -> Self {
        Self::AuthRejected(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an `OperationFailed` from an optional server message, falling
    /// back to `fallback` when the server sent nothing usable.
    pub fn operation_failed(server_message: Option<&str>, fallback: &str) -> Self {
        let message = server_message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback);
        Self::OperationFailed(message.to_string())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The text shown inline next to the failed control.
    pub fn user_message(&self) -> &str {
        match self {
            Self::TokenInvalid(m)
            | Self::AuthRejected(m)
            | Self::Forbidden(m)
            | Self::Validation(m)
            | Self::OperationFailed(m) => m,
        }
    }
}
