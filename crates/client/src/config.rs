//! Configuration loader
//!
//! Loads `AuthwayConfig` for non-browser hosts (desktop apps, CLIs, tests).
//! Browser hosts construct the config in code.
//!
//! ## Loading Strategy
//! 1. Read a `.env` file from the working directory if present (`dotenvy`)
//! 2. Attempt to load from environment variables
//! 3. If the required ones are missing, fall back to a config file
//! 4. Supports JSON and TOML formats, keys in the SDK's camelCase
//!
//! ## Environment Variables
//! - `AUTHWAY_URL`: Authorization server base URL (required)
//! - `AUTHWAY_CLIENT_ID`: OAuth client ID (required)
//! - `AUTHWAY_REDIRECT_URI`: Registered redirect URI (required)
//! - `AUTHWAY_SCOPE`: Space-separated scopes
//! - `AUTHWAY_POST_LOGOUT_REDIRECT_URI`: Where logout returns to
//! - `AUTHWAY_AUTO_REFRESH`: Whether the refresh scheduler runs (true/false)
//! - `AUTHWAY_REFRESH_INTERVAL_MS`: Scheduler interval in milliseconds
//!
//! ## File Locations
//! `./authway.json`, `./authway.toml`, `./config/authway.json`,
//! `./config/authway.toml`, relative to the working directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use authway_domain::{AuthError, AuthwayConfig, Result};

const ENV_URL: &str = "AUTHWAY_URL";
const ENV_CLIENT_ID: &str = "AUTHWAY_CLIENT_ID";
const ENV_REDIRECT_URI: &str = "AUTHWAY_REDIRECT_URI";
const ENV_SCOPE: &str = "AUTHWAY_SCOPE";
const ENV_POST_LOGOUT_REDIRECT_URI: &str = "AUTHWAY_POST_LOGOUT_REDIRECT_URI";
const ENV_AUTO_REFRESH: &str = "AUTHWAY_AUTO_REFRESH";
const ENV_REFRESH_INTERVAL_MS: &str = "AUTHWAY_REFRESH_INTERVAL_MS";

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `AuthError::Config` if neither the environment nor a config file
/// yields a valid configuration.
pub fn load() -> Result<AuthwayConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from the process environment.
///
/// # Errors
/// Returns `AuthError::Config` if a required variable is missing or a value
/// is invalid.
pub fn load_from_env() -> Result<AuthwayConfig> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from a `.env`-style file without touching the process
/// environment.
///
/// # Errors
/// Returns `AuthError::Config` if the file cannot be read or parsed, or the
/// variables it defines do not form a valid configuration.
pub fn load_from_env_file(path: &Path) -> Result<AuthwayConfig> {
    let iter = dotenvy::from_path_iter(path)
        .map_err(|e| AuthError::Config(format!("Failed to read {}: {e}", path.display())))?;

    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) =
            item.map_err(|e| AuthError::Config(format!("Invalid env file line: {e}")))?;
        vars.insert(key, value);
    }

    load_from_lookup(|key| vars.get(key).cloned())
}

/// Build a configuration from an arbitrary variable lookup.
///
/// # Errors
/// Returns `AuthError::Config` if a required variable is missing or a value
/// is invalid.
pub fn load_from_lookup<F>(lookup: F) -> Result<AuthwayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| {
        lookup(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AuthError::Config(format!("Missing environment variable: {key}")))
    };

    let mut config =
        AuthwayConfig::new(required(ENV_URL)?, required(ENV_CLIENT_ID)?, required(ENV_REDIRECT_URI)?);

    if let Some(scope) = lookup(ENV_SCOPE) {
        config = config.with_scope(scope.split_whitespace());
    }
    if let Some(uri) = lookup(ENV_POST_LOGOUT_REDIRECT_URI) {
        config = config.with_post_logout_redirect_uri(uri);
    }
    if let Some(value) = lookup(ENV_AUTO_REFRESH) {
        config = config.with_auto_refresh(parse_bool(ENV_AUTO_REFRESH, &value)?);
    }
    if let Some(value) = lookup(ENV_REFRESH_INTERVAL_MS) {
        let ms = value.trim().parse::<u64>().map_err(|e| {
            AuthError::Config(format!("Invalid {ENV_REFRESH_INTERVAL_MS}: {e}"))
        })?;
        config = config.with_refresh_interval(Duration::from_millis(ms));
    }

    config.validate()?;
    Ok(config)
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AuthError::Config(format!("Invalid {key}: {other}"))),
    }
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations.
///
/// # Errors
/// Returns `AuthError::Config` if the file is missing, malformed, or the
/// configuration it holds is invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AuthwayConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            AuthError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<AuthwayConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| AuthError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| AuthError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(AuthError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing standard config file, if any
#[must_use]
pub fn find_config_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    [
        cwd.join("authway.json"),
        cwd.join("authway.toml"),
        cwd.join("config").join("authway.json"),
        cwd.join("config").join("authway.toml"),
    ]
    .into_iter()
    .find(|path| path.exists())
}
