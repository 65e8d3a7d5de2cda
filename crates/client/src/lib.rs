//! `lmsgate-client`: HTTP bindings for the identity and role services.
//!
//! Every request goes through [`ApiClient`], which attaches the persisted
//! bearer token and applies the portal-wide `401`/`403` handling.

pub mod callback;
pub mod config;
pub mod http;
pub mod identity;
pub mod navigator;
pub mod portal;
pub mod roles;

pub use callback::complete_sign_in;
pub use config::ClientConfig;
pub use http::{ApiClient, ApiError};
pub use identity::HttpIdentityService;
pub use navigator::ChannelNavigator;
pub use portal::Portal;
pub use roles::HttpRoleService;
