/// Feedforward OAuth2/OIDC Provider
///
/// Registers the Feedforward collective identity service (a Zitadel
/// instance) with the auth host. Identity comes from the OIDC userinfo
/// endpoint; only `email` and `preferred_username` are kept.
use super::{
    ApiConfig, AuthCallback, CallbackContext, GrantConfig, NormalizedIdentity, ProviderDescriptor,
    ProviderRegistry,
};
use crate::auth::error::AuthError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PROVIDER_NAME: &str = "feedforward";
pub const OIDC_API_NAME: &str = "feedforward-oidc";
pub const DEFAULT_ORIGIN: &str = "https://auth.feedforward-collective.com";
pub const DEFAULT_CALLBACK: &str = "http://localhost:3000/connect/discord/redirect";

// Placeholders; real credentials live in the stored grant overrides
const PLACEHOLDER_KEY: &str = "put_key_in_admin_panel";
const PLACEHOLDER_SECRET: &str = "put_secret_in_admin_panel";

const SCOPES: &[&str] = &[
    "openid",
    "profile",
    "email",
    "urn:zitadel:iam:user:metadata",
    "urn:zitadel:iam:org:project:roles",
];

fn bearer_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("Authorization".to_string(), "Bearer {auth}".to_string())])
}

/// OAuth2 API (authorize, token)
pub fn oauth_api(origin: &str) -> ApiConfig {
    ApiConfig {
        origin: origin.to_string(),
        version: "v2".to_string(),
        path: "oauth/{version}/{path}".to_string(),
        headers: bearer_headers(),
    }
}

/// OIDC API (userinfo)
pub fn oidc_api(origin: &str) -> ApiConfig {
    ApiConfig {
        origin: origin.to_string(),
        version: "v1".to_string(),
        path: "oidc/{version}/{path}".to_string(),
        headers: bearer_headers(),
    }
}

/// Static grant configuration for the given identity origin
pub fn grant_config(origin: &str, callback: &str) -> Result<GrantConfig, AuthError> {
    let api = oauth_api(origin);

    Ok(GrantConfig {
        key: PLACEHOLDER_KEY.to_string(),
        secret: PLACEHOLDER_SECRET.to_string(),
        callback: callback.to_string(),
        scope: SCOPES.iter().map(|s| s.to_string()).collect(),
        authorize_url: api.url("authorize")?.to_string(),
        access_url: api.url("token")?.to_string(),
        oauth: 2,
        scope_delimiter: " ".to_string(),
    })
}

/// Userinfo normalization for Feedforward
pub struct FeedforwardCallback {
    userinfo_api: ApiConfig,
}

impl FeedforwardCallback {
    pub fn new(origin: &str) -> Self {
        Self {
            userinfo_api: oidc_api(origin),
        }
    }
}

#[async_trait]
impl AuthCallback for FeedforwardCallback {
    async fn normalize(
        &self,
        access_token: &str,
        ctx: &CallbackContext<'_>,
    ) -> Result<NormalizedIdentity, AuthError> {
        let body = ctx
            .requester
            .get(&self.userinfo_api, "userinfo", access_token)
            .await
            .map_err(|e| {
                warn!("{} userinfo request failed: {}", OIDC_API_NAME, e);
                AuthError::LoginFlowFailed
            })?;

        debug!("{} userinfo response: {}", ctx.provider, body);

        let field = |name: &str| body.get(name).and_then(|v| v.as_str()).map(str::to_string);

        Ok(NormalizedIdentity {
            email: field("email"),
            username: field("preferred_username"),
        })
    }
}

/// Register the `feedforward` provider. Failure here is fatal to startup.
pub fn register(
    registry: &dyn ProviderRegistry,
    origin: &str,
    callback: &str,
) -> Result<(), AuthError> {
    let descriptor = ProviderDescriptor {
        icon: String::new(),
        enabled: true,
        grant: grant_config(origin, callback)?,
        callback: Arc::new(FeedforwardCallback::new(origin)),
        placeholders: vec![PLACEHOLDER_KEY.to_string(), PLACEHOLDER_SECRET.to_string()],
    };

    registry.register(PROVIDER_NAME, descriptor)?;
    info!("Registered OAuth2 provider {} ({})", PROVIDER_NAME, origin);

    Ok(())
}
