//! Authorization callback handling
//!
//! Runs once per page load. When the current URL carries an authorization
//! response it is validated against the pending login in storage, the code is
//! exchanged, the PKCE material is discarded and the response parameters are
//! stripped from the address bar.
//!
//! Order of checks:
//! 1. `error` present: the server refused; stop.
//! 2. `state` absent or different from the stored state: stop before any
//!    network call.
//! 3. `code` absent: nothing to exchange.
//! 4. Stored verifier absent: stop.
//! 5. Exchange.

use std::sync::Arc;

use authway_domain::AuthError;
use tracing::{error, info};
use url::Url;

use crate::storage::{StorageKey, TokenStore};
use crate::token_manager::TokenManager;
use crate::traits::Navigator;
use crate::types::TokenSet;

const CALLBACK_PARAMS: [&str; 4] = ["code", "state", "error", "error_description"];

/// Authorization response parameters read from a redirect URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Read the parameters from `url`'s query. Empty values count as absent.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            slot.get_or_insert_with(|| value.into_owned());
        }
        params
    }

    /// Whether the URL looks like an authorization response at all
    #[must_use]
    pub const fn is_callback(&self) -> bool {
        self.code.is_some() || self.state.is_some() || self.error.is_some()
    }
}

/// Remove the authorization response parameters from `url`, keeping any
/// other query parameters and the fragment.
pub fn strip_callback_params(url: &mut Url) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !CALLBACK_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

/// Processes the authorization redirect
#[derive(Clone)]
pub struct CallbackHandler {
    store: TokenStore,
    tokens: TokenManager,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandler").finish_non_exhaustive()
    }
}

impl CallbackHandler {
    #[must_use]
    pub fn new(tokens: TokenManager, navigator: Arc<dyn Navigator>) -> Self {
        Self { store: tokens.store().clone(), tokens, navigator }
    }

    /// Handle the current URL.
    ///
    /// Returns `Ok(None)` when the URL is not an authorization response, or
    /// when it carries a valid `state` but no `code`. Calling this again after
    /// a processed callback returns `Ok(None)` because the parameters have
    /// been stripped.
    ///
    /// Whatever the outcome, a processed response consumes the stored
    /// verifier and state and is removed from the address bar.
    ///
    /// # Errors
    /// `AuthorizationServer`, `InvalidState`, `MissingVerifier` or
    /// `TokenExchangeFailed`.
    pub async fn handle(&self) -> Result<Option<TokenSet>, AuthError> {
        let Ok(mut url) = Url::parse(&self.navigator.current_url()) else {
            return Ok(None);
        };

        let params = CallbackParams::from_url(&url);
        if !params.is_callback() {
            return Ok(None);
        }

        let result = self.process(params).await;

        self.store.remove(StorageKey::CodeVerifier);
        self.store.remove(StorageKey::State);
        strip_callback_params(&mut url);
        self.navigator.replace_url(url.as_str());

        match &result {
            Ok(Some(_)) => info!("authorization callback completed"),
            Ok(None) => {}
            Err(e) => error!(error = %e, "authorization callback failed"),
        }
        result
    }

    async fn process(&self, params: CallbackParams) -> Result<Option<TokenSet>, AuthError> {
        if let Some(error) = params.error {
            return Err(AuthError::AuthorizationServer {
                error,
                description: params.error_description,
            });
        }

        let stored_state = self.store.get(StorageKey::State);
        match (params.state.as_deref(), stored_state.as_deref()) {
            (Some(received), Some(expected)) if received == expected => {}
            _ => return Err(AuthError::InvalidState),
        }

        let Some(code) = params.code else {
            return Ok(None);
        };

        let verifier = self.store.get(StorageKey::CodeVerifier).ok_or(AuthError::MissingVerifier)?;

        self.tokens.exchange_code(&code, &verifier).await.map(Some)
    }
}
