//! Persistent token store
//!
//! [`TokenStore`] wraps a [`StorageBackend`] with the fixed key set the engine
//! uses. Backend failures are logged and then treated as "absent" (reads) or
//! ignored (writes) so a browser with storage disabled degrades to an
//! unauthenticated session instead of crashing. [`TokenStore::try_set`] is
//! the one fallible write, for callers that cannot proceed without it.

use std::sync::Arc;

use authway_domain::constants::{
    ACCESS_TOKEN_KEY, CODE_VERIFIER_KEY, ID_TOKEN_KEY, REFRESH_TOKEN_KEY, STATE_KEY, USER_KEY,
};
use authway_domain::AuthError;
use thiserror::Error;
use tracing::warn;

use crate::traits::StorageBackend;

pub mod memory;

#[cfg(feature = "keychain")]
pub mod keychain;

#[cfg(feature = "keychain")]
pub use keychain::KeyringStorage;
pub use memory::MemoryStorage;

/// Storage backend error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The medium is disabled or not present (private mode, no window)
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The medium refused the write (quota exceeded)
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for AuthError {
    fn from(error: StorageError) -> Self {
        Self::StorageUnavailable(error.to_string())
    }
}

/// Keys the engine persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    IdToken,
    CodeVerifier,
    State,
    User,
}

impl StorageKey {
    /// Every key, in the order `clear_all` removes them
    pub const ALL: [Self; 6] = [
        Self::AccessToken,
        Self::RefreshToken,
        Self::IdToken,
        Self::CodeVerifier,
        Self::State,
        Self::User,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => ACCESS_TOKEN_KEY,
            Self::RefreshToken => REFRESH_TOKEN_KEY,
            Self::IdToken => ID_TOKEN_KEY,
            Self::CodeVerifier => CODE_VERIFIER_KEY,
            Self::State => STATE_KEY,
            Self::User => USER_KEY,
        }
    }
}

/// Infallible key/value facade over a storage backend
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Read a key; backend errors read as absent.
    #[must_use]
    pub fn get(&self, key: StorageKey) -> Option<String> {
        match self.backend.get(key.as_str()) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "storage read failed");
                None
            }
        }
    }

    pub fn set(&self, key: StorageKey, value: &str) {
        if let Err(e) = self.try_set(key, value) {
            warn!(key = key.as_str(), error = %e, "storage write failed");
        }
    }

    /// Write a key, reporting backend failure.
    ///
    /// # Errors
    /// Returns the backend's `StorageError`.
    pub fn try_set(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
        self.backend.set(key.as_str(), value)
    }

    pub fn remove(&self, key: StorageKey) {
        if let Err(e) = self.backend.remove(key.as_str()) {
            warn!(key = key.as_str(), error = %e, "storage remove failed");
        }
    }

    /// Write `value` if present, otherwise remove the key.
    pub fn set_or_remove(&self, key: StorageKey, value: Option<&str>) {
        match value {
            Some(v) => self.set(key, v),
            None => self.remove(key),
        }
    }

    /// Remove every engine key. Keys the engine does not own are untouched.
    pub fn clear_all(&self) {
        for key in StorageKey::ALL {
            self.remove(key);
        }
    }
}
