/// Authorization-code grant
///
/// Builds the provider authorize URL and exchanges the returned code for an
/// access token at the token endpoint.
use crate::auth::error::AuthError;
use crate::auth::providers::GrantConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OAuth2 token request
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
}

/// OAuth2 token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token for API requests
    pub access_token: String,

    /// Token type (usually "Bearer")
    #[serde(default)]
    pub token_type: Option<String>,

    /// Token expiration time in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,

    /// Refresh token, unused here
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// ID token (for OpenID Connect providers)
    #[serde(default)]
    pub id_token: Option<String>,

    /// OAuth2 scopes granted
    #[serde(default)]
    pub scope: Option<String>,
}

/// Generate the authorization URL for the OAuth2 flow
pub fn authorization_url(grant: &GrantConfig, state: &str) -> Result<String, AuthError> {
    let mut url = url::Url::parse(&grant.authorize_url)
        .map_err(|e| AuthError::ConfigError(format!("Invalid auth URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &grant.key)
        .append_pair("redirect_uri", &grant.callback)
        .append_pair("scope", &grant.scope_string())
        .append_pair("state", state);

    Ok(url.to_string())
}

/// Exchange the authorization code for tokens
pub async fn exchange_code(
    http_client: &reqwest::Client,
    grant: &GrantConfig,
    code: &str,
) -> Result<TokenResponse, AuthError> {
    let token_request = TokenRequest {
        grant_type: "authorization_code",
        code,
        client_id: &grant.key,
        client_secret: &grant.secret,
        redirect_uri: &grant.callback,
    };

    debug!("Exchanging authorization code at {}", grant.access_url);

    let response = http_client
        .post(&grant.access_url)
        .form(&token_request)
        .send()
        .await
        .map_err(|e| AuthError::CodeExchangeFailed(format!("Token request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(AuthError::CodeExchangeFailed(format!(
            "Token request failed with status {}: {}",
            status, error_text
        )));
    }

    response.json().await.map_err(|e| {
        AuthError::CodeExchangeFailed(format!("Failed to parse token response: {}", e))
    })
}
