/// OAuth2 Provider registration
///
/// This module defines the pieces a provider hands to the host: a static
/// grant configuration, API request descriptors, and a normalization
/// callback that turns an access token into a local identity.
use crate::auth::error::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub mod feedforward;

/// Grant configuration for an authorization-code exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrantConfig {
    /// Client ID registered with the provider
    pub key: String,

    /// Client secret registered with the provider
    pub secret: String,

    /// Redirect URI the provider sends the browser back to
    pub callback: String,

    /// Scopes to request, in order
    pub scope: Vec<String>,

    /// Authorization endpoint URL
    pub authorize_url: String,

    /// Token endpoint URL
    pub access_url: String,

    /// OAuth protocol version (only 2 is supported)
    pub oauth: u8,

    /// Separator used when joining scopes
    pub scope_delimiter: String,
}

impl GrantConfig {
    /// Validate the grant configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.key.is_empty() {
            return Err(AuthError::ConfigError(
                "OAuth2 client key cannot be empty".to_string(),
            ));
        }

        if self.secret.is_empty() {
            return Err(AuthError::ConfigError(
                "OAuth2 client secret cannot be empty".to_string(),
            ));
        }

        if self.oauth != 2 {
            return Err(AuthError::ConfigError(format!(
                "Unsupported OAuth version: {}",
                self.oauth
            )));
        }

        for (field, value) in [
            ("callback", &self.callback),
            ("authorize_url", &self.authorize_url),
            ("access_url", &self.access_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| AuthError::ConfigError(format!("Invalid {}: {}", field, e)))?;
        }

        Ok(())
    }

    /// Scopes joined with the configured delimiter
    pub fn scope_string(&self) -> String {
        self.scope.join(&self.scope_delimiter)
    }
}

/// Request descriptor for one provider API.
///
/// `path` is a template with `{version}` and `{path}` placeholders, header
/// values may contain `{auth}` which is replaced with the access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    pub origin: String,
    pub version: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
}

impl ApiConfig {
    /// Resolve an endpoint path against this API
    pub fn url(&self, path: &str) -> Result<url::Url, AuthError> {
        let resolved = self
            .path
            .replace("{version}", &self.version)
            .replace("{path}", path);
        let full = format!("{}/{}", self.origin.trim_end_matches('/'), resolved);

        url::Url::parse(&full)
            .map_err(|e| AuthError::ConfigError(format!("Invalid API url {}: {}", full, e)))
    }

    /// Header values with the access token substituted
    pub fn auth_headers(&self, access_token: &str) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(name, template)| (name.clone(), template.replace("{auth}", access_token)))
            .collect()
    }
}

/// Identity fields extracted from a provider's userinfo response
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NormalizedIdentity {
    pub email: Option<String>,
    pub username: Option<String>,
}

/// Authenticated GET helper supplied by the host to provider callbacks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApiRequester: Send + Sync {
    async fn get(
        &self,
        api: &ApiConfig,
        path: &str,
        access_token: &str,
    ) -> Result<serde_json::Value, AuthError>;
}

/// `ApiRequester` backed by a shared reqwest client
pub struct HttpApiRequester {
    http_client: reqwest::Client,
}

impl HttpApiRequester {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl ApiRequester for HttpApiRequester {
    async fn get(
        &self,
        api: &ApiConfig,
        path: &str,
        access_token: &str,
    ) -> Result<serde_json::Value, AuthError> {
        let url = api.url(path)?;
        debug!("Provider API request: GET {}", url);

        let mut request = self.http_client.get(url);
        for (name, value) in api.auth_headers(access_token) {
            request = request.header(name, value);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AuthError::ProviderError(format!(
                "Request failed with status {}: {}",
                status, error_text
            )));
        }

        Ok(response.json().await?)
    }
}

/// Context handed to a provider callback
pub struct CallbackContext<'a> {
    /// Name the provider was registered under
    pub provider: &'a str,

    /// Host helper for authenticated API calls
    pub requester: &'a dyn ApiRequester,
}

/// Maps an access token to the identity the host needs
#[async_trait]
pub trait AuthCallback: Send + Sync {
    async fn normalize(
        &self,
        access_token: &str,
        ctx: &CallbackContext<'_>,
    ) -> Result<NormalizedIdentity, AuthError>;
}

/// Everything a provider registers with the host
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub icon: String,
    pub enabled: bool,
    pub grant: GrantConfig,
    pub callback: Arc<dyn AuthCallback>,
    /// Credential values shipped in code that must be replaced before use
    pub placeholders: Vec<String>,
}

impl ProviderDescriptor {
    /// Whether the grant still carries a shipped placeholder key or secret
    pub fn uses_placeholder_credentials(&self) -> bool {
        self.placeholders
            .iter()
            .any(|p| *p == self.grant.key || *p == self.grant.secret)
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("icon", &self.icon)
            .field("enabled", &self.enabled)
            .field("grant", &self.grant)
            .finish_non_exhaustive()
    }
}

/// Capability for registering providers with an auth host
pub trait ProviderRegistry: Send + Sync {
    fn register(&self, name: &str, descriptor: ProviderDescriptor) -> Result<(), AuthError>;
}
