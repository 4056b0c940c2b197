// Authentication Configuration
// Manages the JWT secret, the identity provider origin and stored grant overrides

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::error::AuthError;
use super::providers::GrantConfig;
use super::providers::feedforward;

/// Main authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT secret for signing session tokens (minimum 32 characters)
    pub jwt_secret: String,

    /// Session JWT lifetime in seconds (default: 30 days)
    #[serde(default = "default_jwt_expires_in")]
    pub jwt_expires_in: u64,

    /// Origin of the Feedforward identity service
    #[serde(default = "default_feedforward_origin")]
    pub feedforward_origin: String,

    /// Frontend page the provider redirects back to
    #[serde(default = "default_callback_url")]
    pub callback_url: String,

    /// Grant settings edited outside the code (admin copy). An entry here
    /// wins over the static grant configuration the provider registers.
    #[serde(default)]
    pub providers: HashMap<String, ProviderOverride>,
}

impl AuthConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < 32 {
            return Err(AuthError::InvalidConfig {
                key: "jwt_secret".to_string(),
                reason: "must be at least 32 characters".to_string(),
            });
        }

        if self.jwt_expires_in < 60 {
            return Err(AuthError::InvalidConfig {
                key: "jwt_expires_in".to_string(),
                reason: "must be at least 60 seconds".to_string(),
            });
        }

        for (field, value) in [
            ("feedforward_origin", &self.feedforward_origin),
            ("callback_url", &self.callback_url),
        ] {
            if url::Url::parse(value).is_err() {
                return Err(AuthError::InvalidConfig {
                    key: field.to_string(),
                    reason: "must be an absolute URL".to_string(),
                });
            }
        }

        for (name, provider) in &self.providers {
            provider.validate(name)?;
        }

        Ok(())
    }

    /// Get JWT lifetime as Duration
    pub fn jwt_duration(&self) -> Duration {
        Duration::from_secs(self.jwt_expires_in)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(), // Must be set explicitly
            jwt_expires_in: default_jwt_expires_in(),
            feedforward_origin: default_feedforward_origin(),
            callback_url: default_callback_url(),
            providers: HashMap::new(),
        }
    }
}

/// Stored grant settings for one provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderOverride {
    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default)]
    pub callback: Option<String>,
}

impl ProviderOverride {
    fn validate(&self, provider_name: &str) -> Result<(), AuthError> {
        for (field, value) in [("key", &self.key), ("secret", &self.secret)] {
            if value.as_deref() == Some("") {
                return Err(AuthError::InvalidConfig {
                    key: format!("providers.{}.{}", provider_name, field),
                    reason: "cannot be empty".to_string(),
                });
            }
        }

        if let Some(callback) = &self.callback
            && !callback.starts_with("http://")
            && !callback.starts_with("https://")
        {
            return Err(AuthError::InvalidConfig {
                key: format!("providers.{}.callback", provider_name),
                reason: "must start with http:// or https://".to_string(),
            });
        }

        Ok(())
    }

    /// Apply the stored values on top of a registered grant
    pub fn apply(&self, grant: &mut GrantConfig, enabled: &mut bool) {
        if let Some(value) = self.enabled {
            *enabled = value;
        }
        if let Some(key) = &self.key {
            grant.key = key.clone();
        }
        if let Some(secret) = &self.secret {
            grant.secret = secret.clone();
        }
        if let Some(callback) = &self.callback {
            grant.callback = callback.clone();
        }
    }
}

// Default value functions
fn default_jwt_expires_in() -> u64 {
    86400 * 30 // 30 days
}

fn default_feedforward_origin() -> String {
    feedforward::DEFAULT_ORIGIN.to_string()
}

fn default_callback_url() -> String {
    feedforward::DEFAULT_CALLBACK.to_string()
}
