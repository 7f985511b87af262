//! Platform keychain storage backend
//!
//! Persists each engine key as its own credential under one service name
//! (macOS Keychain, Windows Credential Manager, Linux kernel keyutils). This
//! is the desktop counterpart of browser `localStorage`.

use keyring::Entry;
use tracing::debug;

use super::StorageError;
use crate::traits::StorageBackend;

/// Keychain-backed [`StorageBackend`]
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    service_name: String,
}

impl KeyringStorage {
    /// # Arguments
    /// * `service_name` - Keychain service identifier (e.g. "authway.my-app")
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Entry::new(&self.service_name, key).map_err(|e| map_keyring_error(key, &e))
    }
}

fn map_keyring_error(key: &str, error: &keyring::Error) -> StorageError {
    match error {
        keyring::Error::NoStorageAccess(_) | keyring::Error::PlatformFailure(_) => {
            StorageError::Unavailable(format!("{key}: {error}"))
        }
        keyring::Error::TooLong(..) => StorageError::QuotaExceeded(format!("{key}: {error}")),
        other => StorageError::Backend(format!("{key}: {other}")),
    }
}

impl StorageBackend for KeyringStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(map_keyring_error(key, &e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        debug!(service = %self.service_name, key = %key, "storing credential");
        self.entry(key)?.set_password(value).map_err(|e| map_keyring_error(key, &e))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(map_keyring_error(key, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_length_errors_to_quota() {
        let err = keyring::Error::TooLong("password".to_string(), 10);
        assert!(matches!(map_keyring_error("k", &err), StorageError::QuotaExceeded(_)));
    }

    #[test]
    fn maps_other_errors_to_backend() {
        let err = keyring::Error::Invalid("service".to_string(), "empty".to_string());
        assert!(matches!(map_keyring_error("k", &err), StorageError::Backend(_)));
    }

    /// Absent credentials read as empty and remove as a no-op.
    ///
    /// Runs against keyring's in-memory mock store. The builder is process
    /// wide, so run the ignored round trip on its own (`-- --ignored`).
    #[test]
    fn missing_credentials_are_not_errors() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        let storage = KeyringStorage::new("authway.test");

        assert!(storage.get("authway_access_token").unwrap().is_none());
        storage.remove("authway_access_token").unwrap();
        storage.set("authway_access_token", "token").unwrap();
    }

    // Touches the real OS keychain.
    #[test]
    #[ignore = "requires a platform keychain"]
    fn round_trip_against_platform_keychain() {
        let storage = KeyringStorage::new("authway.test");
        storage.set("authway_state", "abc").unwrap();
        assert_eq!(storage.get("authway_state").unwrap().as_deref(), Some("abc"));
        storage.remove("authway_state").unwrap();
        assert!(storage.get("authway_state").unwrap().is_none());
        storage.remove("authway_state").unwrap();
    }
}
