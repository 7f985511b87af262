//! Authentication service
//!
//! The single owner of `AuthState`. Combines the callback handler, the token
//! manager and the refresh scheduler, and publishes every transition on a
//! `tokio::sync::watch` channel that UI layers subscribe to.
//!
//! Lifecycle:
//! 1. `initialize()` once per page load: handle a pending authorization
//!    response, otherwise hydrate from storage, then start the scheduler.
//! 2. `login()` / `logout()` on user action.
//! 3. Scheduler ticks call `refresh_if_expired()` while authenticated.
//!
//! Dropping the last clone of the service cancels the scheduler.

use std::sync::{Arc, Weak};

use authway_domain::{AuthError, AuthEvent, AuthState, AuthwayConfig, User};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::authorize::{build_authorization_url, build_end_session_url};
use crate::callback::CallbackHandler;
use crate::client::OAuthClient;
use crate::jwt;
use crate::pkce::PkcePair;
use crate::scheduler::{RefreshScheduler, SchedulerHandle};
use crate::storage::{StorageKey, TokenStore};
use crate::token_manager::TokenManager;
use crate::traits::{Navigator, StorageBackend, TokenEndpoint};
use crate::types::TokenSet;

/// Hook run after an authorization redirect has been processed
pub type RedirectCallback = Arc<dyn Fn(&AuthState) + Send + Sync>;

/// What storage currently holds
enum StoredSession {
    Missing,
    Expired,
    NoUser,
    Valid { access_token: String, id_token: Option<String>, user: User },
}

struct ServiceInner {
    config: AuthwayConfig,
    tokens: TokenManager,
    callback: CallbackHandler,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<AuthState>,
    on_redirect_callback: Mutex<Option<RedirectCallback>>,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

/// Authentication service
///
/// Cheap to clone; clones share state, storage and the scheduler.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("client_id", &self.inner.config.client_id)
            .field("status", &self.inner.state.borrow().status())
            .finish_non_exhaustive()
    }
}

impl AuthService {
    /// Create a service talking to the configured token endpoint over HTTP.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if `config` is invalid.
    pub fn new(
        config: AuthwayConfig,
        storage: Arc<dyn StorageBackend>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, AuthError> {
        config.validate()?;
        let endpoint = Arc::new(OAuthClient::new(&config));
        Self::with_endpoint(config, storage, navigator, endpoint)
    }

    /// Create a service with a custom token endpoint implementation.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if `config` is invalid.
    pub fn with_endpoint(
        config: AuthwayConfig,
        storage: Arc<dyn StorageBackend>,
        navigator: Arc<dyn Navigator>,
        endpoint: Arc<dyn TokenEndpoint>,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let store = TokenStore::new(storage);
        let tokens = TokenManager::new(store, endpoint, config.refresh_token_policy);
        let callback = CallbackHandler::new(tokens.clone(), Arc::clone(&navigator));
        let (state, _) = watch::channel(AuthState::default());

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                tokens,
                callback,
                navigator,
                state,
                on_redirect_callback: Mutex::new(None),
                scheduler: Mutex::new(None),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthwayConfig {
        &self.inner.config
    }

    /// Run `callback` after each processed authorization redirect that
    /// produced tokens. Replaces any previous hook.
    pub fn set_redirect_callback<F>(&self, callback: F)
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        *self.inner.on_redirect_callback.lock() = Some(Arc::new(callback));
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every state change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Access token of the authenticated session
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token().map(ToString::to_string)
    }

    /// Display user of the authenticated session (unverified claims)
    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    /// Expiry of the access token of the authenticated session
    #[must_use]
    pub fn token_expiration(&self) -> Option<DateTime<Utc>> {
        self.access_token().as_deref().and_then(jwt::token_expiration)
    }

    /// Start the engine for this page load.
    ///
    /// Processes an authorization response in the current URL if there is
    /// one, otherwise restores the session from storage. Starts the refresh
    /// scheduler when `autoRefresh` is enabled.
    pub async fn initialize(&self) -> AuthState {
        self.apply(AuthEvent::Started);

        match self.inner.callback.handle().await {
            Ok(Some(_)) => {
                self.hydrate().await;
                let hook = self.inner.on_redirect_callback.lock().clone();
                if let Some(hook) = hook {
                    hook(&self.state());
                }
            }
            Ok(None) => self.hydrate().await,
            Err(e) => self.apply(AuthEvent::CallbackFailed(e.user_message())),
        }

        if self.inner.config.auto_refresh {
            self.start_auto_refresh();
        }

        self.state()
    }

    /// Begin a login: persist fresh PKCE material and navigate to the
    /// authorization endpoint.
    ///
    /// # Errors
    /// Returns `AuthError::RandomUnavailable`, `AuthError::Config`, or
    /// `AuthError::StorageUnavailable` when the verifier and state cannot be
    /// persisted. The message is also written into `AuthState.error`, and no
    /// navigation happens.
    pub fn login(&self) -> Result<Url, AuthError> {
        let prepared = PkcePair::generate().and_then(|pkce| {
            let url = build_authorization_url(&self.inner.config, &pkce)?;
            let store = self.inner.tokens.store();
            store.try_set(StorageKey::CodeVerifier, &pkce.verifier)?;
            store.try_set(StorageKey::State, &pkce.state)?;
            Ok(url)
        });

        match prepared {
            Ok(url) => {
                info!("redirecting to authorization endpoint");
                self.inner.navigator.navigate(url.as_str());
                Ok(url)
            }
            Err(e) => {
                warn!(error = %e, "login could not start");
                self.apply(AuthEvent::LoginFailed(e.user_message()));
                Err(e)
            }
        }
    }

    /// End the session locally and, when an ID token was held, at the server.
    ///
    /// Returns the end-session URL navigated to, if any.
    pub fn logout(&self) -> Option<Url> {
        let id_token = self.inner.tokens.id_token();
        self.inner.tokens.clear();
        self.apply(AuthEvent::LoggedOut);
        info!("logged out");

        let id_token = id_token?;
        match build_end_session_url(&self.inner.config, &id_token) {
            Ok(url) => {
                self.inner.navigator.navigate(url.as_str());
                Some(url)
            }
            Err(e) => {
                warn!(error = %e, "end-session URL could not be built");
                None
            }
        }
    }

    /// Refresh the access token now and publish the outcome.
    ///
    /// Concurrent callers share one request.
    ///
    /// # Errors
    /// `NoRefreshToken` or `RefreshFailed` after the session has been moved
    /// to "Session expired"; `SessionCleared` if the session ended while the
    /// request was pending (state untouched).
    pub async fn refresh(&self) -> Result<TokenSet, AuthError> {
        match self.inner.tokens.refresh().await {
            Ok(tokens) => match self.stored_session() {
                StoredSession::Valid { access_token, id_token, user } => {
                    self.apply(AuthEvent::SessionRestored { user, access_token, id_token });
                    Ok(tokens)
                }
                StoredSession::Expired => {
                    self.discard_refreshed("refreshed access token has no usable expiry")
                }
                StoredSession::NoUser => self.discard_refreshed("no user claims after refresh"),
                StoredSession::Missing => {
                    self.discard_refreshed("refreshed tokens could not be persisted")
                }
            },
            Err(AuthError::SessionCleared) => Err(AuthError::SessionCleared),
            Err(e) => {
                self.apply(AuthEvent::SessionExpired);
                Err(e)
            }
        }
    }

    /// A refresh that succeeded on the wire but left no usable session ends
    /// the session like a failed one.
    fn discard_refreshed(&self, reason: &str) -> Result<TokenSet, AuthError> {
        warn!(reason, "refreshed session unusable; clearing");
        self.inner.tokens.clear();
        self.apply(AuthEvent::SessionExpired);
        Err(AuthError::RefreshFailed(reason.to_string()))
    }

    /// Scheduler tick: refresh if the stored access token is expired.
    ///
    /// Returns `Ok(true)` if a refresh happened.
    ///
    /// # Errors
    /// Same as [`AuthService::refresh`].
    pub async fn refresh_if_expired(&self) -> Result<bool, AuthError> {
        let Some(access_token) = self.inner.tokens.access_token() else {
            debug!("access token gone from storage");
            self.apply(AuthEvent::NoSession);
            return Ok(false);
        };

        if !self.inner.tokens.is_expired(&access_token) {
            return Ok(false);
        }

        debug!("access token expired; refreshing");
        self.refresh().await.map(|_| true)
    }

    /// Re-read storage without refreshing, e.g. after another tab changed it.
    ///
    /// An expired token leaves the state as it is; the next scheduler tick or
    /// explicit refresh handles it.
    pub fn reconcile(&self) {
        match self.stored_session() {
            StoredSession::Valid { access_token, id_token, user } => {
                self.apply(AuthEvent::SessionRestored { user, access_token, id_token });
            }
            StoredSession::Missing | StoredSession::NoUser => self.apply(AuthEvent::NoSession),
            StoredSession::Expired => debug!("stored token expired; reconcile leaves state"),
        }
    }

    /// Start the refresh scheduler if it is not already running.
    ///
    /// Natively this must be called from within a tokio runtime; on `wasm32`
    /// the task runs on the browser event loop.
    pub fn start_auto_refresh(&self) {
        let mut slot = self.inner.scheduler.lock();
        if slot.as_ref().is_some_and(SchedulerHandle::is_running) {
            return;
        }

        let weak: Weak<ServiceInner> = Arc::downgrade(&self.inner);
        let scheduler = RefreshScheduler::new(self.inner.config.refresh_interval());
        let handle = scheduler.spawn(self.subscribe(), move || {
            let weak = weak.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let Err(e) = (Self { inner }).refresh_if_expired().await {
                    debug!(error = %e, "scheduled refresh ended the session");
                }
            }
        });
        *slot = Some(handle);
    }

    /// Stop the refresh scheduler and wait for its task to exit.
    pub async fn stop_auto_refresh(&self) {
        let handle = self.inner.scheduler.lock().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    #[must_use]
    pub fn is_auto_refresh_running(&self) -> bool {
        self.inner.scheduler.lock().as_ref().is_some_and(SchedulerHandle::is_running)
    }

    async fn hydrate(&self) {
        match self.stored_session() {
            StoredSession::Valid { access_token, id_token, user } => {
                debug!("restoring stored session");
                self.apply(AuthEvent::SessionRestored { user, access_token, id_token });
            }
            StoredSession::Missing | StoredSession::NoUser => {
                debug!("no usable stored session");
                self.apply(AuthEvent::NoSession);
            }
            StoredSession::Expired => {
                debug!("stored access token expired; refreshing");
                // `refresh` publishes success and failure itself.
                let _ = self.refresh().await;
            }
        }
    }

    fn stored_session(&self) -> StoredSession {
        let tokens = &self.inner.tokens;
        let Some(access_token) = tokens.access_token() else {
            return StoredSession::Missing;
        };
        if tokens.is_expired(&access_token) {
            return StoredSession::Expired;
        }
        match tokens.current_user() {
            Some(user) => StoredSession::Valid { access_token, id_token: tokens.id_token(), user },
            None => StoredSession::NoUser,
        }
    }

    fn apply(&self, event: AuthEvent) {
        self.inner.state.send_if_modified(|state| {
            let next = state.transition(event);
            if next == *state {
                return false;
            }
            if next.status() != state.status() {
                info!(from = ?state.status(), to = ?next.status(), "auth state changed");
            }
            *state = next;
            true
        });
    }
}
