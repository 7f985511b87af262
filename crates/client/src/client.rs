//! HTTP token endpoint client
//!
//! Performs the two form-encoded POSTs the engine needs against
//! `{authwayUrl}/oauth2/token`:
//! - `grant_type=authorization_code` with the PKCE verifier
//! - `grant_type=refresh_token`
//!
//! Public client: no client secret is ever sent.

use std::time::Duration;

use async_trait::async_trait;
use authway_domain::AuthwayConfig;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::traits::TokenEndpoint;
use crate::types::{OAuthError, TokenResponse, TokenSet};

/// Error type for token endpoint operations
#[derive(Debug, Error)]
pub enum OAuthClientError {
    /// HTTP request failed (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// OAuth server returned an RFC 6749 error body
    #[error("OAuth error: {0}")]
    OAuthError(OAuthError),

    /// Non-success status without a parseable OAuth error body
    #[error("token endpoint returned HTTP {status}")]
    UnexpectedStatus { status: u16 },

    /// Success status but the body is not a token response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Empty refresh token passed in
    #[error("No refresh token available")]
    NoRefreshToken,
}

/// Token endpoint client for one configured OAuth client
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client_id: String,
    redirect_uri: String,
    token_url: String,
    timeout: Duration,
    http: Client,
}

impl OAuthClient {
    /// Create a client for `config`'s token endpoint.
    ///
    /// Uses `config.http_timeout()` as the per-request timeout (set on each
    /// request so it also applies to the browser fetch backend).
    #[must_use]
    pub fn new(config: &AuthwayConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            token_url: config.token_endpoint(),
            timeout: config.http_timeout(),
            http: Client::new(),
        }
    }

    /// Token endpoint URL requests are sent to
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> Result<TokenSet, OAuthClientError> {
        let response =
            self.http.post(&self.token_url).timeout(self.timeout).form(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "token endpoint rejected request");
            return Err(serde_json::from_str::<OAuthError>(&body).map_or(
                OAuthClientError::UnexpectedStatus { status: status.as_u16() },
                OAuthClientError::OAuthError,
            ));
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| OAuthClientError::ParseError(e.to_string()))?;

        Ok(token_response.into())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl TokenEndpoint for OAuthClient {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.post_form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.client_id),
            ("redirect_uri", &self.redirect_uri),
            ("code_verifier", code_verifier),
        ])
        .await
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        self.post_form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.client_id),
        ])
        .await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for client.
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> OAuthClient {
        OAuthClient::new(&AuthwayConfig::new(server.uri(), "spa", "http://localhost:3000/callback"))
    }

    /// Validates `OAuthClient::exchange_code` form body and response mapping.
    ///
    /// Assertions:
    /// - The request carries grant type, code, verifier and client id.
    /// - The response maps into a `TokenSet` with refresh and ID tokens.
    #[tokio::test]
    async fn test_exchange_code_sends_pkce_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("code_verifier=verifier-123"))
            .and(body_string_contains("client_id=spa"))
            .and(body_string_contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "rt",
                "id_token": "idt",
                "scope": "openid profile email"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = client_for(&server).exchange_code("abc", "verifier-123").await.unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.id_token.as_deref(), Some("idt"));
    }

    #[tokio::test]
    async fn test_refresh_maps_oauth_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "refresh token revoked"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).refresh_access_token("rt").await.unwrap_err();
        match err {
            OAuthClientError::OAuthError(body) => assert_eq!(body.error, "invalid_grant"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server).refresh_access_token("rt").await.unwrap_err();
        assert!(matches!(err, OAuthClientError::UnexpectedStatus { status: 502 }));
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"token_type\":\"Bearer\"}"))
            .mount(&server)
            .await;

        let err = client_for(&server).exchange_code("c", "v").await.unwrap_err();
        assert!(matches!(err, OAuthClientError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_empty_refresh_token_short_circuits() {
        let server = MockServer::start().await;
        let err = client_for(&server).refresh_access_token("").await.unwrap_err();
        assert!(matches!(err, OAuthClientError::NoRefreshToken));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
