// Authentication Module
// OAuth2 provider registration and the host side of the login flow

pub mod config;
pub mod error;
pub mod grant;
pub mod jwt;
pub mod manager;
pub mod providers;
pub mod registry;
pub mod routes;
pub mod users;

pub use config::{AuthConfig, ProviderOverride};
pub use error::AuthError;
pub use manager::{AuthManager, CallbackParams, Session};
pub use providers::{
    ApiConfig, ApiRequester, AuthCallback, GrantConfig, HttpApiRequester, NormalizedIdentity,
    ProviderDescriptor, ProviderRegistry,
};
pub use registry::InMemoryProviderRegistry;
pub use users::{InMemoryUserStore, UserRecord, UserStore};
