//! Host seams
//!
//! The engine never touches the network, the storage medium or the browser
//! location directly. Each of these is a trait so the same engine runs in a
//! browser (`web` feature), on a desktop (`keychain` feature) and in tests.

use async_trait::async_trait;

use crate::client::OAuthClientError;
use crate::storage::StorageError;
use crate::types::TokenSet;

/// Token endpoint operations
///
/// Implemented by [`crate::client::OAuthClient`] over HTTP; tests swap in
/// `testing::MockTokenEndpoint`. Futures are `Send` except on `wasm32`,
/// where fetch futures are not.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange an authorization code for tokens
    ///
    /// # Arguments
    /// * `code` - Authorization code from the redirect callback
    /// * `code_verifier` - PKCE verifier persisted when the login started
    ///
    /// # Errors
    /// Returns error if the request fails, the server rejects the grant, or
    /// the response cannot be parsed
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenSet, OAuthClientError>;

    /// Obtain a new access token with a refresh token
    ///
    /// # Errors
    /// Returns error if the refresh token is invalid or revoked, or the
    /// request fails
    async fn refresh_access_token(&self, refresh_token: &str)
        -> Result<TokenSet, OAuthClientError>;
}

/// Persistent string key/value medium
///
/// Values must survive a full page reload. Errors are reported to
/// [`crate::storage::TokenStore`], which logs them and degrades to "absent".
pub trait StorageBackend: Send + Sync {
    /// # Errors
    /// Returns `StorageError` if the medium cannot be read
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    /// Returns `StorageError` if the medium rejects the write
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key succeeds.
    ///
    /// # Errors
    /// Returns `StorageError` if the medium cannot be written
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Browser location access
pub trait Navigator: Send + Sync {
    /// The full current URL (scheme, host, path, query and fragment)
    fn current_url(&self) -> String;

    /// Rewrite the address bar without adding a history entry
    fn replace_url(&self, url: &str);

    /// Leave the application for `url`
    fn navigate(&self, url: &str);
}
