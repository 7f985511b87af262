//! Browser host integration
//!
//! `window.localStorage` as the storage backend and `window.location` /
//! `window.history` as the navigator. Both types hold no JS handles and look
//! the window up on every call, so they are `Send + Sync` and survive being
//! moved into the engine.
//!
//! Compiled only for `wasm32`; on native targets the `web` feature is inert.

use tracing::warn;
use wasm_bindgen::JsValue;
use web_sys::Storage;

use crate::storage::StorageError;
use crate::traits::{Navigator, StorageBackend};

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// `window.localStorage` backend
#[derive(Debug, Clone, Copy, Default)]
pub struct WebStorage;

impl WebStorage {
    fn storage() -> Result<Storage, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(js_message(&e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".to_string()))
    }
}

impl StorageBackend for WebStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?.get_item(key).map_err(|e| StorageError::Backend(js_message(&e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?.set_item(key, value).map_err(|e| {
            let message = js_message(&e);
            if message.contains("Quota") {
                StorageError::QuotaExceeded(message)
            } else {
                StorageError::Backend(message)
            }
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::storage()?.remove_item(key).map_err(|e| StorageError::Backend(js_message(&e)))
    }
}

/// `window.location` / `window.history` navigator
#[derive(Debug, Clone, Copy, Default)]
pub struct WebNavigator;

impl Navigator for WebNavigator {
    fn current_url(&self) -> String {
        web_sys::window().and_then(|w| w.location().href().ok()).unwrap_or_default()
    }

    fn replace_url(&self, url: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let result = window
            .history()
            .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = result {
            warn!(error = %js_message(&e), "history.replaceState failed");
        }
    }

    fn navigate(&self, url: &str) {
        let Some(window) = web_sys::window() else {
            warn!("navigation requested without a window");
            return;
        };
        if let Err(e) = window.location().set_href(url) {
            warn!(error = %js_message(&e), "location assignment failed");
        }
    }
}
