//! Authway client engine: OAuth 2.0 Authorization Code + PKCE for public
//! clients.
//!
//! Runs in the browser (`web` feature on `wasm32`), on the desktop
//! (`keychain` feature) or anywhere a [`StorageBackend`] and a [`Navigator`]
//! can be supplied.
//!
//! Native hosts drive the engine from a tokio runtime. On `wasm32` background
//! work is queued on the JS event loop instead (see [`runtime`]).
//!
//! # Features
//!
//! - **PKCE Flow**: RFC 7636 S256 with a CSRF state token per login
//! - **Callback Handling**: state validation before any network call, URL
//!   cleanup, one-shot PKCE material
//! - **Token Lifecycle**: expiry detection, single-flight refresh, session
//!   epoch so late refresh results never resurrect a cleared session
//! - **Background Refresh**: polling scheduler tied to the authenticated state
//! - **Observable State**: `AuthState` published on a `tokio::sync::watch`
//!   channel
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   AuthService   │  Owns AuthState, publishes transitions
//! └────────┬────────┘
//!          │
//!          ├──► CallbackHandler    (redirect validation + code exchange)
//!          ├──► TokenManager       (token writes, expiry, single-flight refresh)
//!          │         │
//!          │         ├──► TokenStore ──► StorageBackend (memory / keychain / localStorage)
//!          │         └──► TokenEndpoint (OAuthClient over reqwest)
//!          ├──► RefreshScheduler   (interval task, cancelled on drop)
//!          └──► Navigator          (location + history)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use authway_client::{AuthService, MemoryNavigator, MemoryStorage};
//! use authway_domain::AuthwayConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthwayConfig::new(
//!         "http://localhost:4444",
//!         "my-spa",
//!         "http://localhost:3000/callback",
//!     );
//!
//!     let service = AuthService::new(
//!         config,
//!         Arc::new(MemoryStorage::new()),
//!         Arc::new(MemoryNavigator::new("http://localhost:3000/")),
//!     )?;
//!
//!     let state = service.initialize().await;
//!     if !state.is_authenticated() {
//!         let url = service.login()?;
//!         println!("Continue at {url}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Security
//!
//! - Tokens live in whatever the storage backend provides; in the browser
//!   that is `localStorage`, readable by any script on the origin
//! - ID tokens are decoded without signature verification and are for
//!   display only
//! - No client secret is ever sent

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod authorize;
pub mod callback;
pub mod client;
pub mod config;
pub mod jwt;
pub mod navigator;
pub mod pkce;
pub mod runtime;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod token_manager;
pub mod traits;
pub mod types;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod web;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use authorize::{build_authorization_url, build_end_session_url};
pub use callback::{CallbackHandler, CallbackParams};
pub use client::{OAuthClient, OAuthClientError};
pub use jwt::{decode_claims, is_expired, token_expiration};
pub use navigator::MemoryNavigator;
pub use pkce::{challenge_for, generate_code_verifier, generate_state, PkcePair};
pub use scheduler::{RefreshScheduler, SchedulerHandle};
pub use service::{AuthService, RedirectCallback};
#[cfg(feature = "keychain")]
pub use storage::KeyringStorage;
pub use storage::{MemoryStorage, StorageError, StorageKey, TokenStore};
pub use token_manager::TokenManager;
pub use traits::{Navigator, StorageBackend, TokenEndpoint};
pub use types::{OAuthError, TokenResponse, TokenSet};
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use web::{WebNavigator, WebStorage};
