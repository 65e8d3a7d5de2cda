//! Single sign-on callback handling.

use reqwest::Url;

use lmsgate_auth::{SessionStore, landing_path};

pub const NO_TOKEN_PATH: &str = "/login?error=no_token";
pub const AUTH_FAILED_PATH: &str = "/login?error=auth_failed";

/// Finish sign-in from the callback URL (`/auth/callback?token=...`) and
/// return the path to replace it with. The token never appears in the
/// returned path.
pub async fn complete_sign_in(session: &SessionStore, callback_url: &str) -> &'static str {
    let Some(token) = callback_token(callback_url) else {
        tracing::warn!("sign-in callback carried no token");
        return NO_TOKEN_PATH;
    };

    session.login(token).await;

    match session.user() {
        Some(user) if session.is_authenticated() => landing_path(&user),
        _ => {
            tracing::warn!("sign-in token was rejected");
            AUTH_FAILED_PATH
        }
    }
}

/// The non-empty `token` query parameter. Relative callback paths are
/// accepted.
fn callback_token(callback_url: &str) -> Option<String> {
    let url = match Url::parse(callback_url) {
        Ok(url) => url,
        Err(_) => Url::parse("http://localhost").ok()?.join(callback_url).ok()?,
    };

    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_read_from_absolute_or_relative_urls() {
        assert_eq!(
            callback_token("https://lms.example.com/auth/callback?token=abc.def.ghi").as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(
            callback_token("/auth/callback?state=x&token=a%2Eb.c").as_deref(),
            Some("a.b.c")
        );
    }

    #[test]
    fn missing_or_blank_token_is_none() {
        assert_eq!(callback_token("/auth/callback"), None);
        assert_eq!(callback_token("/auth/callback?token="), None);
        assert_eq!(callback_token("/auth/callback?token=%20"), None);
    }
}
