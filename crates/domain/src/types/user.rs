//! User identity claims
//!
//! Decoded from the ID token *without signature verification*. A `User` is
//! display data for the UI; authorization decisions belong to the resource
//! server, which validates the access token itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

/// Claim set read from the ID token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
pub struct User {
    /// Subject identifier
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    /// Every other claim (`iss`, `aud`, `exp`, custom claims, ...)
    #[serde(flatten)]
    #[cfg_attr(feature = "ts-gen", ts(skip))]
    pub claims: Map<String, Value>,
}

impl User {
    /// Build a user from a decoded claim object. Returns `None` when the
    /// payload has no string `sub`.
    #[must_use]
    pub fn from_claims(claims: Value) -> Option<Self> {
        serde_json::from_value(claims).ok()
    }

    /// Look up any claim by name, including the typed ones.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<Value> {
        match name {
            "sub" => Some(Value::String(self.sub.clone())),
            "name" => self.name.clone().map(Value::String),
            "email" => self.email.clone().map(Value::String),
            "email_verified" => self.email_verified.map(Value::Bool),
            "picture" => self.picture.clone().map(Value::String),
            "preferred_username" => self.preferred_username.clone().map(Value::String),
            other => self.claims.get(other).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_claims_keeps_unknown_claims() {
        let user = User::from_claims(json!({
            "sub": "user-1",
            "name": "Ada",
            "email": "ada@example.com",
            "email_verified": true,
            "tenant_id": "t-42",
            "exp": 1_900_000_000
        }))
        .unwrap();

        assert_eq!(user.sub, "user-1");
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.email_verified, Some(true));
        assert_eq!(user.claim("tenant_id"), Some(json!("t-42")));
        assert_eq!(user.claim("email"), Some(json!("ada@example.com")));
        assert!(user.claim("picture").is_none());
    }

    #[test]
    fn from_claims_requires_subject() {
        assert!(User::from_claims(json!({ "name": "nobody" })).is_none());
        assert!(User::from_claims(json!({ "sub": 7 })).is_none());
        assert!(User::from_claims(json!("not an object")).is_none());
    }
}
