//! Error types used throughout the engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::SESSION_EXPIRED_MESSAGE;

/// Authentication engine error
///
/// Protocol failures (`InvalidState`, `MissingVerifier`,
/// `AuthorizationServer`) stop the attempt and surface in `AuthState.error`.
/// The session-expired class (`NoRefreshToken`, `RefreshFailed`) is always
/// destructive to the local session. `StorageUnavailable` only surfaces from
/// `login`, when the PKCE material cannot be persisted; failed reads degrade
/// to "no session".
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AuthError {
    #[error("Invalid state parameter")]
    InvalidState,

    #[error("Missing code verifier")]
    MissingVerifier,

    #[error("Authorization server error: {}", description.as_deref().unwrap_or(error))]
    AuthorizationServer { error: String, description: Option<String> },

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Secure random source unavailable: {0}")]
    RandomUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session was cleared while the request was in flight")]
    SessionCleared,
}

impl AuthError {
    /// Whether this error ends the local session (re-login required).
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::NoRefreshToken | Self::RefreshFailed(_))
    }

    /// The message written into `AuthState.error`.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidState => "Invalid state parameter".to_string(),
            Self::MissingVerifier => "Missing code verifier".to_string(),
            Self::AuthorizationServer { error, description } => {
                description.clone().unwrap_or_else(|| error.clone())
            }
            Self::NoRefreshToken | Self::RefreshFailed(_) => SESSION_EXPIRED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for Authway operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_server_message_prefers_description() {
        let err = AuthError::AuthorizationServer {
            error: "access_denied".to_string(),
            description: Some("The user denied the request".to_string()),
        };
        assert_eq!(err.user_message(), "The user denied the request");

        let bare =
            AuthError::AuthorizationServer { error: "access_denied".to_string(), description: None };
        assert_eq!(bare.user_message(), "access_denied");
        assert_eq!(bare.to_string(), "Authorization server error: access_denied");
    }

    #[test]
    fn session_expired_class() {
        assert!(AuthError::NoRefreshToken.is_session_expired());
        assert!(AuthError::RefreshFailed("400".to_string()).is_session_expired());
        assert!(!AuthError::InvalidState.is_session_expired());
        assert_eq!(AuthError::NoRefreshToken.user_message(), "Session expired");
        assert_eq!(AuthError::RefreshFailed("boom".to_string()).user_message(), "Session expired");
    }

    #[test]
    fn protocol_messages() {
        assert_eq!(AuthError::InvalidState.user_message(), "Invalid state parameter");
        assert_eq!(AuthError::MissingVerifier.user_message(), "Missing code verifier");
    }

    #[test]
    fn serializes_tagged() {
        let json = serde_json::to_value(AuthError::TokenExchangeFailed("400".to_string()))
            .unwrap();
        assert_eq!(json["type"], "TokenExchangeFailed");
        assert_eq!(json["message"], "400");
    }
}
