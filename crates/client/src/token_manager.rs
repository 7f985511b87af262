//! Token lifecycle manager
//!
//! Owns every write of token material to the store:
//! - Persisting the tokens of a successful code exchange
//! - Expiry detection on the stored access token
//! - Refresh-token exchange with a single-flight guard
//! - Clearing the session
//!
//! # Single flight
//!
//! Concurrent `refresh()` callers (the scheduler tick, a manual refresh,
//! hydration) share one in-flight request and all observe its result. Refresh
//! tokens may be single use, so two parallel refreshes with the same token
//! would otherwise invalidate each other.
//!
//! # Session epoch
//!
//! `clear()` and a fresh code exchange bump the session epoch. A refresh that
//! started under an older epoch discards its result (`AuthError::SessionCleared`)
//! instead of writing tokens for a session that no longer exists.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use authway_domain::{AuthError, RefreshTokenPolicy, User};
use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::jwt;
use crate::runtime::{self, BoxFuture};
use crate::storage::{StorageKey, TokenStore};
use crate::traits::TokenEndpoint;
use crate::types::TokenSet;

type SharedRefresh = Shared<BoxFuture<'static, Result<TokenSet, AuthError>>>;

struct Inner {
    store: TokenStore,
    endpoint: Arc<dyn TokenEndpoint>,
    policy: RefreshTokenPolicy,
    // Guards every token write so the epoch check and the write are atomic.
    epoch: Mutex<u64>,
    next_flight: AtomicU64,
    in_flight: Mutex<Option<(u64, SharedRefresh)>>,
}

/// Token lifecycle manager
///
/// Cheap to clone; clones share the in-flight refresh and the epoch.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("policy", &self.inner.policy)
            .field("epoch", &*self.inner.epoch.lock())
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// # Arguments
    /// * `store` - Token store shared with the rest of the engine
    /// * `endpoint` - Token endpoint used for code exchange and refresh
    /// * `policy` - What to do with the old refresh token when a refresh
    ///   response does not reissue one
    #[must_use]
    pub fn new(
        store: TokenStore,
        endpoint: Arc<dyn TokenEndpoint>,
        policy: RefreshTokenPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                endpoint,
                policy,
                epoch: Mutex::new(0),
                next_flight: AtomicU64::new(0),
                in_flight: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &TokenStore {
        &self.inner.store
    }

    /// Current session epoch
    #[must_use]
    pub fn epoch(&self) -> u64 {
        *self.inner.epoch.lock()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner.store.get(StorageKey::AccessToken)
    }

    #[must_use]
    pub fn id_token(&self) -> Option<String> {
        self.inner.store.get(StorageKey::IdToken)
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.inner.store.get(StorageKey::RefreshToken).is_some()
    }

    /// Whether `access_token` is expired now. Undecodable tokens and tokens
    /// without `exp` are expired.
    #[must_use]
    pub fn is_expired(&self, access_token: &str) -> bool {
        jwt::is_expired(access_token)
    }

    /// The display user, decoded from the stored ID token.
    ///
    /// Falls back to the cached decoded user when no ID token is stored.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        if let Some(id_token) = self.id_token() {
            return jwt::decode_user(&id_token);
        }
        self.inner
            .store
            .get(StorageKey::User)
            .and_then(|cached| serde_json::from_str(&cached).ok())
    }

    /// Exchange an authorization code and persist the resulting session.
    ///
    /// Starts a new session epoch: any refresh still in flight for an older
    /// session is discarded when it completes.
    ///
    /// # Errors
    /// Returns `AuthError::TokenExchangeFailed` if the endpoint call fails;
    /// nothing is written in that case.
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenSet, AuthError> {
        let tokens = self.inner.endpoint.exchange_code(code, verifier).await.map_err(|e| {
            warn!(error = %e, "authorization code exchange failed");
            AuthError::TokenExchangeFailed(e.to_string())
        })?;

        let mut epoch = self.inner.epoch.lock();
        *epoch += 1;
        self.inner.write_session(&tokens);
        drop(epoch);

        info!(
            has_refresh_token = tokens.refresh_token.is_some(),
            has_id_token = tokens.id_token.is_some(),
            "authorization code exchanged"
        );
        Ok(tokens)
    }

    /// Refresh the access token.
    ///
    /// Joins the in-flight refresh if there is one.
    ///
    /// # Errors
    /// - `AuthError::NoRefreshToken` if none is stored (storage is cleared)
    /// - `AuthError::RefreshFailed` if the endpoint call fails (storage is
    ///   cleared)
    /// - `AuthError::SessionCleared` if the session ended while the request
    ///   was pending (storage is left alone)
    pub async fn refresh(&self) -> Result<TokenSet, AuthError> {
        let (flight, shared) = {
            let mut slot = self.inner.in_flight.lock();
            if let Some((flight, shared)) = slot.as_ref() {
                debug!(flight, "joining in-flight refresh");
                (*flight, shared.clone())
            } else {
                let flight = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
                let inner = Arc::clone(&self.inner);
                let shared = runtime::boxed(async move { inner.refresh_once().await }).shared();
                *slot = Some((flight, shared.clone()));
                (flight, shared)
            }
        };

        let result = shared.await;

        let mut slot = self.inner.in_flight.lock();
        if slot.as_ref().is_some_and(|(current, _)| *current == flight) {
            *slot = None;
        }
        result
    }

    /// Remove every stored key and start a new session epoch.
    pub fn clear(&self) {
        let mut epoch = self.inner.epoch.lock();
        *epoch += 1;
        self.inner.store.clear_all();
        drop(epoch);

        // New refreshes must not join a flight from the old session.
        self.inner.in_flight.lock().take();
        info!("session cleared");
    }
}

impl Inner {
    async fn refresh_once(&self) -> Result<TokenSet, AuthError> {
        let started_epoch = *self.epoch.lock();

        let Some(refresh_token) = self.store.get(StorageKey::RefreshToken) else {
            warn!("no refresh token available; ending session");
            self.clear_if_current(started_epoch);
            return Err(AuthError::NoRefreshToken);
        };

        let outcome = self.endpoint.refresh_access_token(&refresh_token).await;

        let epoch = self.epoch.lock();
        if *epoch != started_epoch {
            debug!("session changed during refresh; discarding result");
            return Err(AuthError::SessionCleared);
        }

        match outcome {
            Ok(tokens) => {
                self.write_refreshed(&tokens);
                drop(epoch);
                info!(rotated = tokens.refresh_token.is_some(), "access token refreshed");
                Ok(tokens)
            }
            Err(e) => {
                self.store.clear_all();
                drop(epoch);
                warn!(error = %e, "token refresh failed; session cleared");
                Err(AuthError::RefreshFailed(e.to_string()))
            }
        }
    }

    fn clear_if_current(&self, started_epoch: u64) {
        let epoch = self.epoch.lock();
        if *epoch == started_epoch {
            self.store.clear_all();
        }
    }

    // Caller holds the epoch lock.
    fn write_session(&self, tokens: &TokenSet) {
        self.store.set(StorageKey::AccessToken, &tokens.access_token);
        self.store.set_or_remove(StorageKey::RefreshToken, tokens.refresh_token.as_deref());
        self.store.set_or_remove(StorageKey::IdToken, tokens.id_token.as_deref());
        self.write_user(tokens.id_token.as_deref());
    }

    // Caller holds the epoch lock.
    fn write_refreshed(&self, tokens: &TokenSet) {
        self.store.set(StorageKey::AccessToken, &tokens.access_token);

        match (&tokens.refresh_token, self.policy) {
            (Some(refresh_token), _) => self.store.set(StorageKey::RefreshToken, refresh_token),
            (None, RefreshTokenPolicy::Retain) => {}
            (None, RefreshTokenPolicy::Rotate) => self.store.remove(StorageKey::RefreshToken),
        }

        // The ID token is only reissued by some servers; keep the old one otherwise.
        if let Some(id_token) = &tokens.id_token {
            self.store.set(StorageKey::IdToken, id_token);
            self.write_user(Some(id_token));
        }
    }

    fn write_user(&self, id_token: Option<&str>) {
        let cached = id_token
            .and_then(jwt::decode_user)
            .and_then(|user| serde_json::to_string(&user).ok());
        self.store.set_or_remove(StorageKey::User, cached.as_deref());
    }
}
