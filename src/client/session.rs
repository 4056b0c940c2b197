// Client session bookkeeping
// The stored token is the only signal of being logged in; it is never verified here

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::ClientError;
use super::guard::LOGIN_ROUTE;
use super::store::{SessionStore, TOKEN_KEY, USER_KEY};

/// User record as stored client-side. The backend owns the schema, so every
/// field is optional and unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: Option<u64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub confirmed: bool,
    pub blocked: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn get_auth_token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Stored user, or `None` when absent or unreadable
    pub fn get_user(&self) -> Option<User> {
        let raw = self.store.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Ignoring malformed stored user: {}", e);
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_auth_token().is_some()
    }

    /// Store the token and the serialized user together, replacing any
    /// previous session. On failure the previous session is kept intact.
    pub fn set_auth_data(&self, jwt: &str, user_json: &str) -> Result<(), ClientError> {
        self.store.set_many(&[(TOKEN_KEY, jwt), (USER_KEY, user_json)])
    }

    /// Clear the session and return the route to navigate to
    pub fn logout(&self) -> Result<&'static str, ClientError> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)?;
        info!("Logged out");
        Ok(LOGIN_ROUTE)
    }
}
