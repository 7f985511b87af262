//! Integration tests for the login, callback, refresh and logout flows
//!
//! Runs the engine against a wiremock authorization server with in-memory
//! storage and navigation. A "page reload" is a new `AuthService` over the
//! same storage and navigator.

mod support;

use std::collections::HashMap;
use std::time::Duration;

use authway_client::{challenge_for, Navigator, StorageKey};
use authway_domain::{AuthError, AuthStatus};
use support::{access_token, id_token, token_body, TestContext, FAR_FUTURE};
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

fn query(url: &str) -> HashMap<String, String> {
    Url::parse(url).expect("valid url").query_pairs().into_owned().collect()
}

/// Validates the complete login round trip across a page reload.
///
/// # Test Steps
/// 1. Empty storage initializes to unauthenticated
/// 2. `login()` persists verifier and state and navigates to `/oauth2/auth`
/// 3. The browser comes back with `?code=...&state=...`
/// 4. A fresh service exchanges the code with the stored verifier
/// 5. The session is authenticated, PKCE material is gone, the URL is clean
#[tokio::test]
async fn test_full_login_round_trip() {
    let ctx = TestContext::new().await;
    let service = ctx.service();
    assert_eq!(service.initialize().await.status(), AuthStatus::Unauthenticated);

    let auth_url = service.login().expect("login starts");
    let params = query(auth_url.as_str());
    assert_eq!(auth_url.path(), "/oauth2/auth");
    assert_eq!(params["code_challenge_method"], "S256");
    assert_eq!(params["client_id"], "test-spa");

    let store = ctx.store();
    let state = store.get(StorageKey::State).expect("state stored");
    let verifier = store.get(StorageKey::CodeVerifier).expect("verifier stored");
    assert_eq!(params["state"], state);
    assert_eq!(params["code_challenge"], challenge_for(&verifier));

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=XYZ"))
        .and(body_string_contains(format!("code_verifier={verifier}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(
            &access_token(FAR_FUTURE),
            Some("rt-1"),
            Some(&id_token()),
        )))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.navigator.set_current_url(format!("{}?code=XYZ&state={state}", support::REDIRECT_URI));
    let service = ctx.service();
    let auth_state = service.initialize().await;

    assert!(auth_state.is_authenticated());
    assert_eq!(auth_state.user().and_then(|u| u.name.as_deref()), Some("Ada Lovelace"));
    assert_eq!(service.access_token(), Some(access_token(FAR_FUTURE)));
    assert!(store.get(StorageKey::State).is_none());
    assert!(store.get(StorageKey::CodeVerifier).is_none());
    assert_eq!(ctx.navigator.current_url(), support::REDIRECT_URI);
}

/// Scenario B plus idempotence: one POST with the stored verifier, and a
/// second initialization on the same (now cleaned) page does not exchange
/// again.
#[tokio::test]
async fn test_callback_exchanges_once() {
    let ctx = TestContext::new().await;
    let store = ctx.store();
    store.set(StorageKey::State, "abc");
    store.set(StorageKey::CodeVerifier, "v1");

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("code_verifier=v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(
            &access_token(FAR_FUTURE),
            Some("rt-1"),
            Some(&id_token()),
        )))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.navigator.set_current_url(format!("{}?code=XYZ&state=abc", support::REDIRECT_URI));
    let service = ctx.service();
    assert!(service.initialize().await.is_authenticated());

    let reloaded = ctx.service();
    assert!(reloaded.initialize().await.is_authenticated());
}

/// A replayed callback URL (same code and state) after completion must not
/// reach the token endpoint: the stored state is gone.
#[tokio::test]
async fn test_replayed_callback_is_rejected() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(
            &access_token(FAR_FUTURE),
            None,
            Some(&id_token()),
        )))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let store = ctx.store();
    store.set(StorageKey::State, "abc");
    store.set(StorageKey::CodeVerifier, "v1");
    let callback_url = format!("{}?code=XYZ&state=abc", support::REDIRECT_URI);

    ctx.navigator.set_current_url(callback_url.clone());
    assert!(ctx.service().initialize().await.is_authenticated());

    ctx.navigator.set_current_url(callback_url);
    let replayed = ctx.service().initialize().await;
    assert_eq!(replayed.status(), AuthStatus::Error);
    assert_eq!(replayed.error(), Some("Invalid state parameter"));
}

/// State mismatch and missing state both fail without any token request.
#[tokio::test]
async fn test_state_mismatch_makes_no_request() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.server)
        .await;

    for url in ["?code=XYZ&state=forged", "?code=XYZ"] {
        let store = ctx.store();
        store.set(StorageKey::State, "abc");
        store.set(StorageKey::CodeVerifier, "v1");
        ctx.navigator.set_current_url(format!("{}{url}", support::REDIRECT_URI));

        let auth_state = ctx.service().initialize().await;
        assert_eq!(auth_state.status(), AuthStatus::Error, "{url}");
        assert_eq!(auth_state.error(), Some("Invalid state parameter"));
        assert!(!auth_state.is_authenticated());
    }
}

#[tokio::test]
async fn test_authorization_server_error_is_surfaced() {
    let ctx = TestContext::new().await;
    ctx.store().set(StorageKey::State, "abc");
    ctx.navigator.set_current_url(format!(
        "{}?error=access_denied&error_description=The+user+denied+access&state=abc",
        support::REDIRECT_URI
    ));

    let auth_state = ctx.service().initialize().await;
    assert_eq!(auth_state.status(), AuthStatus::Error);
    assert_eq!(auth_state.error(), Some("The user denied access"));
    assert_eq!(ctx.navigator.current_url(), support::REDIRECT_URI);
}

/// Scenario C: expired access token, refresh rejected with HTTP 400.
#[tokio::test]
async fn test_refresh_failure_expires_session() {
    let ctx = TestContext::new().await;
    ctx.seed_session(&access_token(1), Some("rt-1"));

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant"
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let auth_state = ctx.service().initialize().await;

    assert!(!auth_state.is_authenticated());
    assert_eq!(auth_state.error(), Some("Session expired"));
    for key in StorageKey::ALL {
        assert!(ctx.store().get(key).is_none(), "{key:?} not cleared");
    }
}

#[tokio::test]
async fn test_expired_session_without_refresh_token() {
    let ctx = TestContext::new().await;
    ctx.seed_session(&access_token(1), None);

    let auth_state = ctx.service().initialize().await;
    assert_eq!(auth_state.error(), Some("Session expired"));
    assert!(ctx.storage.is_empty());
    assert!(ctx.server.received_requests().await.expect("recording").is_empty());
}

#[tokio::test]
async fn test_refresh_success_restores_session() {
    let ctx = TestContext::new().await;
    ctx.seed_session(&access_token(1), Some("rt-1"));
    let fresh = access_token(FAR_FUTURE);

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&fresh, None, None)))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let service = ctx.service();
    let auth_state = service.initialize().await;

    assert!(auth_state.is_authenticated());
    assert_eq!(service.access_token(), Some(fresh));
    // Default policy keeps the refresh token the server did not reissue.
    assert_eq!(ctx.store().get(StorageKey::RefreshToken).as_deref(), Some("rt-1"));
}

/// A refresh answered with a token the engine cannot read ends the session
/// instead of leaving unusable tokens behind.
#[tokio::test]
async fn test_refresh_with_opaque_token_expires_session() {
    let ctx = TestContext::new().await;
    ctx.seed_session(&access_token(1), Some("rt-1"));

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("opaque-access-token", Some("rt-2"), None)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let service = ctx.service();
    let auth_state = service.initialize().await;

    assert!(!auth_state.is_authenticated());
    assert_eq!(auth_state.error(), Some("Session expired"));
    assert!(ctx.storage.is_empty());
    assert!(service.access_token().is_none());

    // Nothing left to refresh with.
    assert!(matches!(service.refresh().await, Err(AuthError::NoRefreshToken)));
}

/// Concurrent refreshes share one request to the token endpoint.
#[tokio::test]
async fn test_concurrent_refresh_single_request() {
    let ctx = TestContext::new().await;
    ctx.seed_session(&access_token(1), Some("rt-1"));

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body(&access_token(FAR_FUTURE), Some("rt-2"), None))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let service = ctx.service();
    let (a, b, c) = tokio::join!(service.refresh(), service.refresh(), service.refresh());

    let a = a.expect("refresh a");
    assert_eq!(a, b.expect("refresh b"));
    assert_eq!(a, c.expect("refresh c"));
    assert_eq!(ctx.store().get(StorageKey::RefreshToken).as_deref(), Some("rt-2"));
    assert!(service.is_authenticated());
}

/// Scenario D: logout clears every key and navigates to the end-session
/// endpoint with the ID token as hint.
#[tokio::test]
async fn test_logout_redirects_with_id_token_hint() {
    let ctx = TestContext::new().await;
    ctx.seed_session(&access_token(FAR_FUTURE), Some("rt-1"));
    let service = ctx.service();
    assert!(service.initialize().await.is_authenticated());

    let logout_url = service.logout().expect("end-session redirect");
    assert_eq!(logout_url.path(), "/oauth2/sessions/logout");

    let params = query(logout_url.as_str());
    assert_eq!(params["id_token_hint"], id_token());
    assert_eq!(params["post_logout_redirect_uri"], support::REDIRECT_URI);
    assert_eq!(ctx.navigator.last_navigation(), Some(logout_url.to_string()));
    assert!(ctx.storage.is_empty());
    assert!(!service.is_authenticated());
}

/// Storage failures degrade to "no session" on load; a login that could not
/// persist its PKCE material fails without leaving the page.
#[tokio::test]
async fn test_unavailable_storage_degrades_to_unauthenticated() {
    let ctx = TestContext::new().await;
    ctx.seed_session(&access_token(FAR_FUTURE), Some("rt-1"));
    ctx.storage.fail_all(true);

    let service = ctx.service();
    let auth_state = service.initialize().await;
    assert_eq!(auth_state.status(), AuthStatus::Unauthenticated);
    assert!(auth_state.error().is_none());

    let err = service.login().unwrap_err();
    assert!(matches!(err, AuthError::StorageUnavailable(_)));
    assert!(ctx.navigator.last_navigation().is_none());
    assert!(service.state().error().is_some_and(|e| e.starts_with("Storage unavailable")));
}
