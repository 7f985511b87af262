//! Unverified JWT payload decoding
//!
//! The engine reads two things out of tokens: the `exp` claim of the access
//! token (to decide when to refresh) and the identity claims of the ID token
//! (for display). Neither use needs the signature, and nothing decoded here
//! may be used for an authorization decision. Resource servers validate the
//! access token themselves.

use authway_domain::User;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

// JWTs are unpadded, but some issuers pad anyway.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the payload segment of a compact JWT into its claim object.
///
/// Returns `None` for anything that is not three dot-separated segments with
/// a base64url JSON object in the middle.
#[must_use]
pub fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let bytes = PAYLOAD_ENGINE.decode(payload).ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// The `exp` claim as a UTC timestamp
#[must_use]
pub fn token_expiration(token: &str) -> Option<DateTime<Utc>> {
    let exp = exp_seconds(token)?;
    DateTime::from_timestamp(exp, 0)
}

fn exp_seconds(token: &str) -> Option<i64> {
    let claims = decode_claims(token)?;
    let exp = claims.get("exp")?;
    exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))
}

/// Whether `token` is expired at `now_ms` (milliseconds since the epoch).
///
/// A token that cannot be decoded, or that has no numeric `exp`, is expired.
#[must_use]
pub fn is_expired_at(token: &str, now_ms: i64) -> bool {
    match exp_seconds(token) {
        Some(exp) => exp.saturating_mul(1000) < now_ms,
        None => true,
    }
}

/// Whether `token` is expired now. Same rules as [`is_expired_at`].
#[must_use]
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now().timestamp_millis())
}

/// Decode the display user from an ID token.
#[must_use]
pub fn decode_user(id_token: &str) -> Option<User> {
    decode_claims(id_token).and_then(|claims| User::from_claims(Value::Object(claims)))
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    use super::*;

    fn jwt(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn decodes_claims() {
        let token = jwt(&json!({ "sub": "user-1", "exp": 1_900_000_000 }));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims["sub"], "user-1");
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(decode_claims("opaque-token").is_none());
        assert!(decode_claims("a.b").is_none());
        assert!(decode_claims("a.b.c.d").is_none());
        assert!(decode_claims("a.!!!.c").is_none());

        let array = format!("h.{}.s", URL_SAFE_NO_PAD.encode("[1,2]"));
        assert!(decode_claims(&array).is_none());
    }

    #[test]
    fn accepts_padded_payloads() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"sub":"x"}"#);
        assert!(payload.ends_with('='));
        assert!(decode_claims(&format!("h.{payload}.s")).is_some());
    }

    /// Validates the expiry boundary.
    ///
    /// Assertions:
    /// - `exp * 1000 == now` is not expired.
    /// - One millisecond later it is.
    #[test]
    fn expiry_boundary() {
        let token = jwt(&json!({ "exp": 1_700_000_000 }));
        assert!(!is_expired_at(&token, 1_700_000_000_000));
        assert!(is_expired_at(&token, 1_700_000_000_001));
        assert!(!is_expired_at(&token, 1_600_000_000_000));
    }

    #[test]
    fn missing_or_non_numeric_exp_is_expired() {
        assert!(is_expired_at(&jwt(&json!({ "sub": "x" })), 0));
        assert!(is_expired_at(&jwt(&json!({ "exp": "soon" })), 0));
        assert!(is_expired("not-a-jwt"));
    }

    #[test]
    fn token_expiration_reads_exp() {
        let token = jwt(&json!({ "exp": 1_700_000_000 }));
        assert_eq!(token_expiration(&token).unwrap().timestamp(), 1_700_000_000);
        assert!(token_expiration(&jwt(&json!({}))).is_none());
    }

    #[test]
    fn decode_user_requires_sub() {
        let user = decode_user(&jwt(&json!({ "sub": "u", "email": "u@example.com" }))).unwrap();
        assert_eq!(user.email.as_deref(), Some("u@example.com"));
        assert!(decode_user(&jwt(&json!({ "email": "u@example.com" }))).is_none());
    }
}
