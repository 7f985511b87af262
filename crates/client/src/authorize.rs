//! Authorization and end-session request URLs

use authway_domain::{AuthError, AuthwayConfig};
use url::Url;

use crate::pkce::PkcePair;

fn parse_endpoint(endpoint: &str) -> Result<Url, AuthError> {
    Url::parse(endpoint).map_err(|e| AuthError::Config(format!("Invalid endpoint {endpoint}: {e}")))
}

/// Build the authorization endpoint URL for one login attempt.
///
/// Every parameter is form-encoded, so scopes are joined with a single
/// space and sent as `+`.
///
/// # Errors
/// Returns `AuthError::Config` if `authwayUrl` does not form a valid URL.
pub fn build_authorization_url(config: &AuthwayConfig, pkce: &PkcePair) -> Result<Url, AuthError> {
    let mut url = parse_endpoint(&config.authorization_endpoint())?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.scope_string())
        .append_pair("state", &pkce.state)
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", pkce.method());
    Ok(url)
}

/// Build the end-session URL that logs the user out at the server.
///
/// # Errors
/// Returns `AuthError::Config` if `authwayUrl` does not form a valid URL.
pub fn build_end_session_url(config: &AuthwayConfig, id_token: &str) -> Result<Url, AuthError> {
    let mut url = parse_endpoint(&config.end_session_endpoint())?;
    url.query_pairs_mut()
        .append_pair("id_token_hint", id_token)
        .append_pair("post_logout_redirect_uri", config.post_logout_redirect_uri());
    Ok(url)
}
