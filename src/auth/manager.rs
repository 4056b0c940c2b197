/// Authentication Manager
///
/// Host side of the login flow: hands out provider authorize URLs, then on
/// callback exchanges the code, runs the provider's normalization callback,
/// finds or creates the local user and issues the session JWT.
use crate::auth::grant;
use crate::auth::jwt::JwtIssuer;
use crate::auth::providers::{ApiRequester, CallbackContext};
use crate::auth::registry::InMemoryProviderRegistry;
use crate::auth::users::{UserRecord, UserStore};
use crate::auth::{AuthConfig, AuthError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How long an issued `state` stays valid
const STATE_TTL: Duration = Duration::from_secs(600);

/// Upper bound on outstanding `state` values; the oldest is dropped first
const MAX_PENDING_STATES: usize = 10_000;

/// Query parameters the provider appends to the redirect
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub jwt: String,
    pub user: UserRecord,
}

/// Central authentication manager
pub struct AuthManager {
    registry: Arc<InMemoryProviderRegistry>,
    requester: Arc<dyn ApiRequester>,
    users: Arc<dyn UserStore>,
    jwt: JwtIssuer,
    http_client: reqwest::Client,
    pending_states: Mutex<HashMap<String, Instant>>,
    max_pending_states: usize,
}

impl AuthManager {
    /// Create a new authentication manager
    pub fn new(
        config: &AuthConfig,
        registry: Arc<InMemoryProviderRegistry>,
        requester: Arc<dyn ApiRequester>,
        users: Arc<dyn UserStore>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            registry,
            requester,
            users,
            jwt: JwtIssuer::new(&config.jwt_secret, config.jwt_duration()),
            http_client,
            pending_states: Mutex::new(HashMap::new()),
            max_pending_states: MAX_PENDING_STATES,
        }
    }

    /// Override the limit on outstanding login attempts
    pub fn with_max_pending_states(mut self, limit: usize) -> Self {
        self.max_pending_states = limit.max(1);
        self
    }

    /// List all registered providers
    pub fn list_providers(&self) -> Vec<String> {
        self.registry.list()
    }

    /// Generate the provider authorization URL with a fresh `state`
    pub fn connect_url(&self, provider_name: &str) -> Result<String, AuthError> {
        let descriptor = self
            .registry
            .get(provider_name)
            .ok_or_else(|| AuthError::UnsupportedProvider(provider_name.to_string()))?;

        if !descriptor.enabled {
            return Err(AuthError::ProviderDisabled);
        }

        let state = uuid::Uuid::new_v4().simple().to_string();
        {
            let mut pending = self.lock_states()?;
            let now = Instant::now();
            prune_expired(&mut pending, now);

            if pending.len() >= self.max_pending_states {
                let oldest = pending
                    .iter()
                    .min_by_key(|(_, issued)| **issued)
                    .map(|(state, _)| state.clone());
                if let Some(oldest) = oldest {
                    pending.remove(&oldest);
                    warn!(
                        "Pending OAuth state limit ({}) reached, dropped the oldest",
                        self.max_pending_states
                    );
                }
            }

            pending.insert(state.clone(), now);
        }

        grant::authorization_url(&descriptor.grant, &state)
    }

    /// Complete the login for a provider redirect
    pub async fn callback(
        &self,
        provider_name: &str,
        params: CallbackParams,
    ) -> Result<Session, AuthError> {
        if let Some(error) = params.error {
            let description = params
                .error_description
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!("Provider {} returned error {}: {}", provider_name, error, description);
            return Err(AuthError::ProviderError(format!("{}: {}", error, description)));
        }

        let descriptor = self
            .registry
            .get(provider_name)
            .ok_or_else(|| AuthError::UnsupportedProvider(provider_name.to_string()))?;

        if !descriptor.enabled {
            return Err(AuthError::ProviderDisabled);
        }

        let code = params.code.ok_or(AuthError::MissingCode)?;
        self.consume_state(params.state.as_deref())?;

        let tokens = grant::exchange_code(&self.http_client, &descriptor.grant, &code).await?;

        let ctx = CallbackContext {
            provider: provider_name,
            requester: self.requester.as_ref(),
        };
        let identity = descriptor
            .callback
            .normalize(&tokens.access_token, &ctx)
            .await?;

        let user = self.users.find_or_create(&identity, provider_name)?;
        let jwt = self.jwt.issue(user.id)?;

        info!("User {} logged in via {}", user.id, provider_name);
        Ok(Session { jwt, user })
    }

    /// Resolve the user behind a session JWT
    pub fn current_user(&self, token: &str) -> Result<UserRecord, AuthError> {
        let claims = self.jwt.verify(token)?;
        let user = self
            .users
            .find_by_id(claims.id)
            .ok_or(AuthError::AuthenticationRequired)?;

        if user.blocked {
            return Err(AuthError::UserBlocked);
        }
        Ok(user)
    }

    fn consume_state(&self, state: Option<&str>) -> Result<(), AuthError> {
        let state = state.ok_or(AuthError::InvalidState)?;
        let mut pending = self.lock_states()?;
        prune_expired(&mut pending, Instant::now());

        pending.remove(state).ok_or(AuthError::InvalidState)?;
        Ok(())
    }

    fn lock_states(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, Instant>>, AuthError> {
        self.pending_states
            .lock()
            .map_err(|_| AuthError::ConfigError("OAuth state lock poisoned".to_string()))
    }
}

fn prune_expired(pending: &mut HashMap<String, Instant>, now: Instant) {
    pending.retain(|_, issued| now.duration_since(*issued) < STATE_TTL);
}
