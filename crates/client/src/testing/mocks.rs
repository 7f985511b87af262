//! Mock implementations of the engine's seams
//!
//! Provides mock objects for testing purposes.

// Test mocks are simple; errors are clear from their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::OAuthClientError;
use crate::traits::TokenEndpoint;
use crate::types::{OAuthError, TokenSet};

type Scripted = Mutex<VecDeque<Result<TokenSet, OAuthError>>>;

/// A recorded token endpoint call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointCall {
    Exchange { code: String, verifier: String },
    Refresh { refresh_token: String },
}

/// Scripted token endpoint
///
/// Responses are consumed in order per grant type. An exhausted script
/// answers with an `invalid_request` error.
#[derive(Debug, Default)]
pub struct MockTokenEndpoint {
    exchange: Scripted,
    refresh: Scripted,
    calls: Mutex<Vec<EndpointCall>>,
    delay: Mutex<Option<Duration>>,
}

fn oauth_error(code: &str) -> OAuthError {
    OAuthError { error: code.to_string(), error_description: None }
}

impl MockTokenEndpoint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_exchange_ok(&self, tokens: TokenSet) {
        self.exchange.lock().push_back(Ok(tokens));
    }

    pub fn push_exchange_err(&self, error: &str) {
        self.exchange.lock().push_back(Err(oauth_error(error)));
    }

    pub fn push_refresh_ok(&self, tokens: TokenSet) {
        self.refresh.lock().push_back(Ok(tokens));
    }

    pub fn push_refresh_err(&self, error: &str) {
        self.refresh.lock().push_back(Err(oauth_error(error)));
    }

    /// Delay every response by `delay` (tokio time natively, so paused-clock
    /// tests advance it instantly).
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    #[must_use]
    pub fn calls(&self) -> Vec<EndpointCall> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| matches!(c, EndpointCall::Refresh { .. })).count()
    }

    #[must_use]
    pub fn exchange_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| matches!(c, EndpointCall::Exchange { .. })).count()
    }

    async fn respond(&self, script: &Scripted) -> Result<TokenSet, OAuthClientError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            crate::runtime::sleep(delay).await;
        }

        let next = script.lock().pop_front();
        next.unwrap_or_else(|| Err(oauth_error("invalid_request")))
            .map_err(OAuthClientError::OAuthError)
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl TokenEndpoint for MockTokenEndpoint {
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.calls.lock().push(EndpointCall::Exchange {
            code: code.to_string(),
            verifier: code_verifier.to_string(),
        });
        self.respond(&self.exchange).await
    }

    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenSet, OAuthClientError> {
        self.calls.lock().push(EndpointCall::Refresh { refresh_token: refresh_token.to_string() });
        self.respond(&self.refresh).await
    }
}
