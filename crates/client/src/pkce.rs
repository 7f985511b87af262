//! PKCE (Proof Key for Code Exchange) generation for OAuth 2.0
//!
//! Implements RFC 7636 S256 for public clients that cannot hold a client
//! secret. Randomness comes from the operating system CSPRNG only; if it is
//! unavailable generation fails instead of falling back to a weaker source.

use authway_domain::constants::{PKCE_METHOD, STATE_BYTES, VERIFIER_BYTES};
use authway_domain::AuthError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

fn random_base64url(len: usize) -> Result<String, AuthError> {
    let mut bytes = vec![0u8; len];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| AuthError::RandomUnavailable(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Generate a code verifier: 256 random bits, base64url without padding
/// (43 characters, inside RFC 7636's 43-128 limit).
///
/// # Errors
/// Returns `AuthError::RandomUnavailable` if the OS random source fails.
pub fn generate_code_verifier() -> Result<String, AuthError> {
    random_base64url(VERIFIER_BYTES)
}

/// Compute `BASE64URL(SHA256(verifier))` without padding.
#[must_use]
pub fn challenge_for(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a CSRF state token: 128 random bits, base64url without padding.
///
/// # Errors
/// Returns `AuthError::RandomUnavailable` if the OS random source fails.
pub fn generate_state() -> Result<String, AuthError> {
    random_base64url(STATE_BYTES)
}

/// PKCE material for one login attempt
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// Secret kept in storage until the code exchange
    pub verifier: String,

    /// Sent in the authorization request
    pub challenge: String,

    /// Bound to this attempt, round-tripped through the redirect
    pub state: String,
}

impl PkcePair {
    /// Generate a fresh verifier, its challenge, and a state token.
    ///
    /// # Errors
    /// Returns `AuthError::RandomUnavailable` if the OS random source fails.
    pub fn generate() -> Result<Self, AuthError> {
        let verifier = generate_code_verifier()?;
        let challenge = challenge_for(&verifier);
        let state = generate_state()?;

        Ok(Self { verifier, challenge, state })
    }

    /// Challenge method (always "S256")
    #[must_use]
    pub const fn method(&self) -> &'static str {
        PKCE_METHOD
    }
}
