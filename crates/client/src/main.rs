//! `lmsgate`: load a session from a bearer token and print what it can do.

use std::sync::Arc;

use anyhow::Context;

use lmsgate_auth::{MemoryTokenStore, TokenStore, token};
use lmsgate_client::{ClientConfig, Portal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lmsgate_observability::init();

    let config = ClientConfig::from_env();
    let tokens = Arc::new(match std::env::var("LMSGATE_TOKEN") {
        Ok(token) => MemoryTokenStore::with_token(token),
        Err(_) => {
            tracing::warn!("LMSGATE_TOKEN not set; session will be anonymous");
            MemoryTokenStore::new()
        }
    });

    if let Some(raw) = tokens.get() {
        match token::inspect(&raw) {
            Ok(claims) => tracing::info!(sub = ?claims.sub(), exp = ?claims.exp(), "token is live"),
            Err(err) => tracing::warn!(error = %err, "token is not usable"),
        }
    }

    let portal = Portal::new(config, tokens).context("failed to build HTTP client")?;
    tracing::info!(api_url = %portal.config().api_url, "loading session");
    portal.session().load_user().await;

    let session = portal.session().snapshot();
    let summary = serde_json::json!({
        "state": format!("{:?}", session.state),
        "user": session.user,
        "roles": session.roles,
        "permissions": session.permissions,
        "menu": portal
            .menu()
            .iter()
            .map(|item| serde_json::json!({ "label": item.label, "path": item.path }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
