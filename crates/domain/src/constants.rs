//! Authway constants
//!
//! Endpoint paths, storage key names, and configuration defaults shared by
//! every crate in the workspace.

// Authorization server endpoints (relative to `authwayUrl`)
pub const AUTHORIZATION_PATH: &str = "/oauth2/auth";
pub const TOKEN_PATH: &str = "/oauth2/token";
pub const END_SESSION_PATH: &str = "/oauth2/sessions/logout";

// Persisted storage keys
pub const ACCESS_TOKEN_KEY: &str = "authway_access_token";
pub const REFRESH_TOKEN_KEY: &str = "authway_refresh_token";
pub const ID_TOKEN_KEY: &str = "authway_id_token";
pub const CODE_VERIFIER_KEY: &str = "authway_code_verifier";
pub const STATE_KEY: &str = "authway_state";
pub const USER_KEY: &str = "authway_user";

// Configuration defaults
pub const DEFAULT_SCOPES: [&str; 3] = ["openid", "profile", "email"];
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// PKCE
pub const PKCE_METHOD: &str = "S256";
pub const VERIFIER_BYTES: usize = 32; // 256 bits -> 43 base64url chars
pub const STATE_BYTES: usize = 16; // 128 bits -> 22 base64url chars

/// Message surfaced in `AuthState.error` when a session cannot be renewed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired";
