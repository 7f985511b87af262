//! Client configuration
//!
//! Field names serialize in camelCase so a config object written for the
//! browser SDK (`authwayUrl`, `clientId`, `refreshInterval`, ...) deserializes
//! unchanged.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    AUTHORIZATION_PATH, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_REFRESH_INTERVAL_MS, DEFAULT_SCOPES,
    END_SESSION_PATH, TOKEN_PATH,
};
use crate::errors::{AuthError, Result};

/// What to do with the stored refresh token when a refresh response does not
/// reissue one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshTokenPolicy {
    /// Keep the previously stored refresh token.
    #[default]
    Retain,
    /// Treat refresh tokens as single use: drop the old one.
    Rotate,
}

/// Authway client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthwayConfig {
    /// Base URL of the authorization server (e.g. `http://localhost:4444`)
    pub authway_url: String,

    /// OAuth 2.0 client ID
    pub client_id: String,

    /// Redirect URI registered for this client
    pub redirect_uri: String,

    /// Scopes to request, space-joined in the authorization request
    #[serde(default = "default_scopes")]
    pub scope: Vec<String>,

    /// Where the end-session endpoint sends the browser after logout.
    /// Falls back to `redirect_uri`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_logout_redirect_uri: Option<String>,

    /// Run the refresh scheduler while authenticated
    #[serde(default = "default_true")]
    pub auto_refresh: bool,

    /// Scheduler tick interval in milliseconds
    #[serde(default = "default_refresh_interval", rename = "refreshInterval")]
    pub refresh_interval_ms: u64,

    /// Timeout for token endpoint requests
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Refresh-token carry-forward policy
    #[serde(default)]
    pub refresh_token_policy: RefreshTokenPolicy,
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(ToString::to_string).collect()
}

const fn default_true() -> bool {
    true
}

const fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

const fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl AuthwayConfig {
    /// Create a configuration with the three required options and defaults
    /// for everything else.
    #[must_use]
    pub fn new(
        authway_url: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            authway_url: authway_url.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: default_scopes(),
            post_logout_redirect_uri: None,
            auto_refresh: true,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            refresh_token_policy: RefreshTokenPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_post_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.post_logout_redirect_uri = Some(uri.into());
        self
    }

    #[must_use]
    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Per-request timeout for token endpoint calls, rounded up to whole
    /// seconds.
    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout_secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self
    }

    #[must_use]
    pub fn with_refresh_token_policy(mut self, policy: RefreshTokenPolicy) -> Self {
        self.refresh_token_policy = policy;
        self
    }

    /// Check required fields and URL shapes.
    ///
    /// # Errors
    /// Returns `AuthError::Config` naming the first invalid option.
    pub fn validate(&self) -> Result<()> {
        if self.authway_url.trim().is_empty() {
            return Err(AuthError::Config("authwayUrl is required".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Config("clientId is required".to_string()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(AuthError::Config("redirectUri is required".to_string()));
        }

        Url::parse(&self.authway_url)
            .map_err(|e| AuthError::Config(format!("Invalid authwayUrl: {e}")))?;
        Url::parse(&self.redirect_uri)
            .map_err(|e| AuthError::Config(format!("Invalid redirectUri: {e}")))?;
        if let Some(uri) = &self.post_logout_redirect_uri {
            Url::parse(uri)
                .map_err(|e| AuthError::Config(format!("Invalid postLogoutRedirectUri: {e}")))?;
        }

        if self.refresh_interval_ms == 0 {
            return Err(AuthError::Config("refreshInterval must be positive".to_string()));
        }
        if self.http_timeout_secs == 0 {
            return Err(AuthError::Config("httpTimeoutSecs must be positive".to_string()));
        }

        Ok(())
    }

    /// Scopes as the space-separated string sent on the wire
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scope.join(" ")
    }

    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    #[must_use]
    pub fn post_logout_redirect_uri(&self) -> &str {
        self.post_logout_redirect_uri.as_deref().unwrap_or(&self.redirect_uri)
    }

    #[must_use]
    pub fn authorization_endpoint(&self) -> String {
        self.endpoint(AUTHORIZATION_PATH)
    }

    #[must_use]
    pub fn token_endpoint(&self) -> String {
        self.endpoint(TOKEN_PATH)
    }

    #[must_use]
    pub fn end_session_endpoint(&self) -> String {
        self.endpoint(END_SESSION_PATH)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.authway_url.trim_end_matches('/'), path)
    }
}
