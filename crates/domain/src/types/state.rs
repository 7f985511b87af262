//! Authentication state machine
//!
//! `AuthState` is the only state the engine exposes. It is produced by
//! folding `AuthEvent`s through [`AuthState::transition`], a pure function, so
//! every reachable state can be tested without a runtime:
//!
//! ```text
//! Uninitialized ──Started──► Loading ──SessionRestored──► Authenticated
//!                               │ ├────NoSession/SessionExpired/LoggedOut──► Unauthenticated
//!                               │ └────CallbackFailed──► Error
//! ```
//!
//! Fields are private: the only way to obtain an authenticated state is
//! `SessionRestored`, which carries both the access token and the user, so
//! `is_authenticated == (access_token.is_some() && user.is_some())` holds by
//! construction.

use serde::Serialize;
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

use super::user::User;
use crate::constants::SESSION_EXPIRED_MESSAGE;

/// Named machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub enum AuthStatus {
    Uninitialized,
    Loading,
    Authenticated,
    Unauthenticated,
    Error,
}

/// Inputs to the machine
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// Startup began (callback handling or hydration in progress)
    Started,
    /// A valid access token and a decodable user were found in storage
    SessionRestored { user: User, access_token: String, id_token: Option<String> },
    /// Storage holds no usable session
    NoSession,
    /// Refresh failed or no refresh token was available
    SessionExpired,
    /// Callback processing failed with a user-facing message
    CallbackFailed(String),
    /// Building the authorization request failed; other fields are untouched
    LoginFailed(String),
    /// The user logged out
    LoggedOut,
}

/// Observable authentication state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    status: AuthStatus,
    is_authenticated: bool,
    is_loading: bool,
    user: Option<User>,
    access_token: Option<String>,
    id_token: Option<String>,
    error: Option<String>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl AuthState {
    /// Initial state before the engine has looked at the URL or storage.
    ///
    /// `is_loading` starts `true` so a UI rendered before startup shows a
    /// spinner rather than a login button.
    #[must_use]
    pub const fn uninitialized() -> Self {
        Self::blank(AuthStatus::Uninitialized, true, None)
    }

    const fn blank(status: AuthStatus, is_loading: bool, error: Option<String>) -> Self {
        Self {
            status,
            is_authenticated: false,
            is_loading,
            user: None,
            access_token: None,
            id_token: None,
            error,
        }
    }

    /// Apply one event and return the next state.
    #[must_use]
    pub fn transition(&self, event: AuthEvent) -> Self {
        match event {
            AuthEvent::Started => Self::blank(AuthStatus::Loading, true, None),
            AuthEvent::SessionRestored { user, access_token, id_token } => Self {
                status: AuthStatus::Authenticated,
                is_authenticated: true,
                is_loading: false,
                user: Some(user),
                access_token: Some(access_token),
                id_token,
                error: None,
            },
            AuthEvent::NoSession | AuthEvent::LoggedOut => {
                Self::blank(AuthStatus::Unauthenticated, false, None)
            }
            AuthEvent::SessionExpired => Self::blank(
                AuthStatus::Unauthenticated,
                false,
                Some(SESSION_EXPIRED_MESSAGE.to_string()),
            ),
            AuthEvent::CallbackFailed(message) => {
                Self::blank(AuthStatus::Error, false, Some(message))
            }
            AuthEvent::LoginFailed(message) => Self { error: Some(message), ..self.clone() },
        }
    }

    #[must_use]
    pub const fn status(&self) -> AuthStatus {
        self.status
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
