//! Test support: mock token endpoint, JWT fixtures and tracing setup
//!
//! Compiled for the crate's own tests and, behind the `test-utils` feature,
//! for downstream test suites.

pub mod mocks;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

pub use mocks::{EndpointCall, MockTokenEndpoint};
pub use crate::navigator::MemoryNavigator;
pub use crate::storage::MemoryStorage;
use crate::types::TokenSet;

/// Build an unsigned compact JWT carrying `claims`.
#[must_use]
pub fn fake_jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// A one-hour `TokenSet` with the given tokens.
#[must_use]
pub fn fake_token_set(access: &str, refresh: Option<&str>, id_token: Option<&str>) -> TokenSet {
    TokenSet::new(
        access.to_string(),
        refresh.map(ToString::to_string),
        id_token.map(ToString::to_string),
        3600,
        Some("openid profile email".to_string()),
    )
}

/// Install a test tracing subscriber honouring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
