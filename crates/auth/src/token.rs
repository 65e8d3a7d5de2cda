//! Local, unverified inspection of bearer tokens.
//!
//! The portal never verifies a signature. It only reads the payload segment
//! to decide whether a persisted token is worth presenting to the identity
//! service at all. A token that looks expired is treated as "no session".

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Base64url, with or without trailing `=` padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims read from a token payload.
///
/// Every claim is kept; accessors expose the few the portal looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenClaims(Map<String, Value>);

impl TokenClaims {
    /// Expiry in seconds since the epoch. Non-numeric values count as absent.
    pub fn exp(&self) -> Option<i64> {
        match self.0.get("exp")? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
            _ => None,
        }
    }

    fn exp_millis(&self) -> Option<i64> {
        match self.0.get("exp")? {
            Value::Number(n) => match n.as_i64() {
                Some(secs) => Some(secs.saturating_mul(1000)),
                None => n.as_f64().map(|secs| (secs * 1000.0) as i64),
            },
            _ => None,
        }
    }

    pub fn sub(&self) -> Option<&Value> {
        self.0.get("sub")
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token payload could not be decoded")]
    Malformed,

    #[error("token carries no expiry claim")]
    MissingExpiry,

    #[error("token has expired")]
    Expired,
}

/// Decode the payload segment of `token`. Never fails loudly.
pub fn decode(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = PAYLOAD_ENGINE.decode(payload).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(TokenClaims(map)),
        _ => None,
    }
}

/// Decode and check expiry against `now`.
///
/// Expiry is compared in milliseconds: a token whose `exp` is at or before
/// `now` is expired.
pub fn inspect_at(token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
    let claims = decode(token).ok_or(TokenError::Malformed)?;
    let exp_millis = claims.exp_millis().ok_or(TokenError::MissingExpiry)?;
    if exp_millis <= now.timestamp_millis() {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

pub fn inspect(token: &str) -> Result<TokenClaims, TokenError> {
    inspect_at(token, Utc::now())
}

pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    inspect_at(token, now).is_err()
}

/// `true` when the token is unusable right now (malformed, no `exp`, or
/// past its expiry).
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use serde_json::json;

    fn token_with(payload: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.signature")
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn decodes_payload_claims() {
        let token = token_with(&json!({ "sub": 12, "exp": 1_900_000_000 }));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.exp(), Some(1_900_000_000));
        assert_eq!(claims.sub(), Some(&json!(12)));
    }

    #[test]
    fn accepts_padded_payload() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let body = base64::engine::general_purpose::URL_SAFE.encode(br#"{"exp":1}"#);
        let claims = decode(&format!("{header}.{body}.sig")).unwrap();
        assert_eq!(claims.exp(), Some(1));
    }

    #[test]
    fn malformed_tokens_decode_to_none() {
        assert!(decode("").is_none());
        assert!(decode("no-dots-at-all").is_none());
        assert!(decode("a.!!!.c").is_none());
        let not_json = URL_SAFE_NO_PAD.encode(b"not json");
        assert!(decode(&format!("a.{not_json}.c")).is_none());
        let array = URL_SAFE_NO_PAD.encode(b"[1,2]");
        assert!(decode(&format!("a.{array}.c")).is_none());
    }

    #[test]
    fn inspect_reports_why() {
        let now = fixed_now();
        assert_eq!(inspect_at("garbage", now), Err(TokenError::Malformed));
        assert_eq!(
            inspect_at(&token_with(&json!({ "sub": 1 })), now),
            Err(TokenError::MissingExpiry)
        );
        assert_eq!(
            inspect_at(&token_with(&json!({ "exp": "tomorrow" })), now),
            Err(TokenError::MissingExpiry)
        );
        assert_eq!(
            inspect_at(&token_with(&json!({ "exp": now.timestamp() })), now),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn expiry_exactly_now_is_expired() {
        let now = fixed_now();
        assert!(is_expired_at(&token_with(&json!({ "exp": now.timestamp() })), now));
        assert!(!is_expired_at(&token_with(&json!({ "exp": now.timestamp() + 1 })), now));
    }

    #[test]
    fn fractional_expiry_is_honoured() {
        let now = fixed_now();
        let exp = now.timestamp() as f64 + 0.5;
        assert!(!is_expired_at(&token_with(&json!({ "exp": exp })), now));
        let exp = now.timestamp() as f64 - 0.5;
        assert!(is_expired_at(&token_with(&json!({ "exp": exp })), now));
    }

    proptest! {
        #[test]
        fn past_expiry_is_expired(offset in 0i64..10_000_000) {
            let now = fixed_now();
            let token = token_with(&json!({ "exp": now.timestamp() - offset }));
            prop_assert!(is_expired_at(&token, now));
        }

        #[test]
        fn future_expiry_is_live(offset in 1i64..10_000_000) {
            let now = fixed_now();
            let token = token_with(&json!({ "exp": now.timestamp() + offset }));
            prop_assert!(!is_expired_at(&token, now));
        }

        #[test]
        fn missing_expiry_is_expired(sub in "[a-z0-9]{0,12}", iat in any::<i32>()) {
            let token = token_with(&json!({ "sub": sub, "iat": iat }));
            prop_assert!(is_expired_at(&token, fixed_now()));
        }

        #[test]
        fn arbitrary_strings_never_panic(raw in ".{0,64}") {
            if decode(&raw).is_none() {
                prop_assert!(is_expired_at(&raw, fixed_now()));
            }
        }
    }
}
