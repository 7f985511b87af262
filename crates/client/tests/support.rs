#![allow(dead_code)]

use std::sync::Arc;

use authway_client::{AuthService, MemoryNavigator, MemoryStorage, StorageKey, TokenStore};
use authway_client::testing::{fake_jwt, init_test_tracing};
use authway_domain::AuthwayConfig;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Redirect URI registered for the test client.
pub const REDIRECT_URI: &str = "http://localhost:3000/callback";

/// `exp` far in the future (2096).
pub const FAR_FUTURE: i64 = 4_000_000_000;

/// Shared context: one mock authorization server plus the browser-side
/// storage and location that survive "page reloads".
pub struct TestContext {
    /// Mock authorization server.
    pub server: MockServer,
    /// Storage shared by every service built from this context.
    pub storage: Arc<MemoryStorage>,
    /// Simulated address bar.
    pub navigator: Arc<MemoryNavigator>,
}

impl TestContext {
    pub async fn new() -> Self {
        init_test_tracing();
        Self {
            server: MockServer::start().await,
            storage: Arc::new(MemoryStorage::new()),
            navigator: Arc::new(MemoryNavigator::new("http://localhost:3000/")),
        }
    }

    pub fn config(&self) -> AuthwayConfig {
        AuthwayConfig::new(self.server.uri(), "test-spa", REDIRECT_URI).with_auto_refresh(false)
    }

    /// Build a service the way a fresh page load would.
    pub fn service(&self) -> AuthService {
        AuthService::new(self.config(), self.storage.clone(), self.navigator.clone())
            .expect("valid test config")
    }

    pub fn store(&self) -> TokenStore {
        TokenStore::new(self.storage.clone())
    }

    /// Seed a stored session as a previous page load would have left it.
    pub fn seed_session(&self, access_token: &str, refresh_token: Option<&str>) {
        let store = self.store();
        store.set(StorageKey::AccessToken, access_token);
        store.set(StorageKey::IdToken, &id_token());
        if let Some(refresh_token) = refresh_token {
            store.set(StorageKey::RefreshToken, refresh_token);
        }
    }
}

pub fn access_token(exp: i64) -> String {
    fake_jwt(&json!({ "sub": "user-1", "exp": exp }))
}

pub fn id_token() -> String {
    fake_jwt(&json!({
        "sub": "user-1",
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "email_verified": true
    }))
}

/// Token endpoint success body.
pub fn token_body(access_token: &str, refresh_token: Option<&str>, id_token: Option<&str>) -> Value {
    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "openid profile email"
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = json!(refresh_token);
    }
    if let Some(id_token) = id_token {
        body["id_token"] = json!(id_token);
    }
    body
}
