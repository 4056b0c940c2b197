// User store
// Local user records created on first provider login

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

use super::error::AuthError;
use super::providers::NormalizedIdentity;

/// Local user record returned to the browser alongside the session JWT
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: u64,
    pub username: Option<String>,
    pub email: String,
    pub provider: String,
    pub confirmed: bool,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage for local users
pub trait UserStore: Send + Sync {
    fn find_by_email(&self, email: &str) -> Option<UserRecord>;

    fn find_by_id(&self, id: u64) -> Option<UserRecord>;

    fn create(
        &self,
        identity: &NormalizedIdentity,
        provider: &str,
    ) -> Result<UserRecord, AuthError>;

    fn set_blocked(&self, id: u64, blocked: bool) -> Result<(), AuthError>;

    /// Look up the user for a provider identity, creating it on first login
    fn find_or_create(
        &self,
        identity: &NormalizedIdentity,
        provider: &str,
    ) -> Result<UserRecord, AuthError> {
        let email = identity.email.as_deref().ok_or(AuthError::MissingEmail)?;

        match self.find_by_email(email) {
            Some(user) if user.blocked => Err(AuthError::UserBlocked),
            Some(user) => Ok(user),
            None => self.create(identity, provider),
        }
    }
}

#[derive(Default)]
struct Users {
    next_id: u64,
    records: Vec<UserRecord>,
}

/// In-memory `UserStore`
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Users>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Users>, AuthError> {
        self.users
            .lock()
            .map_err(|_| AuthError::ConfigError("User store lock poisoned".to_string()))
    }
}

impl UserStore for InMemoryUserStore {
    fn find_by_email(&self, email: &str) -> Option<UserRecord> {
        let users = self.lock().ok()?;
        users
            .records
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    fn find_by_id(&self, id: u64) -> Option<UserRecord> {
        let users = self.lock().ok()?;
        users.records.iter().find(|u| u.id == id).cloned()
    }

    fn create(
        &self,
        identity: &NormalizedIdentity,
        provider: &str,
    ) -> Result<UserRecord, AuthError> {
        let email = identity.email.as_deref().ok_or(AuthError::MissingEmail)?;
        let mut users = self.lock()?;

        users.next_id += 1;
        let now = Utc::now();
        let user = UserRecord {
            id: users.next_id,
            username: identity.username.clone(),
            email: email.to_lowercase(),
            provider: provider.to_string(),
            confirmed: true,
            blocked: false,
            created_at: now,
            updated_at: now,
        };
        users.records.push(user.clone());

        info!("Created user {} via provider {}", user.id, provider);
        Ok(user)
    }

    fn set_blocked(&self, id: u64, blocked: bool) -> Result<(), AuthError> {
        let mut users = self.lock()?;
        let user = users
            .records
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AuthError::AuthenticationRequired)?;
        user.blocked = blocked;
        user.updated_at = Utc::now();
        Ok(())
    }
}
