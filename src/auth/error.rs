// Authentication Error Types
// Errors raised while registering providers and completing the OAuth2 login flow

use thiserror::Error;

/// Message shown when the provider userinfo lookup fails. The provider's own
/// error detail is logged, never returned.
pub const LOGIN_FLOW_FAILED: &str = "Login flow failed. Please contact the site administrator.";

#[derive(Debug, Error)]
pub enum AuthError {
    // JWT-related errors
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    // Provider registration errors
    #[error("Provider already registered: {0}")]
    DuplicateProvider(String),

    #[error("Unsupported OAuth2 provider: {0}")]
    UnsupportedProvider(String),

    #[error("This provider is disabled")]
    ProviderDisabled,

    // OAuth2-related errors
    #[error("OAuth2 provider error: {0}")]
    ProviderError(String),

    #[error("Invalid OAuth2 state parameter")]
    InvalidState,

    #[error("Authorization code missing from callback")]
    MissingCode,

    #[error("OAuth2 code exchange failed: {0}")]
    CodeExchangeFailed(String),

    #[error("Login flow failed. Please contact the site administrator.")]
    LoginFlowFailed,

    // User errors
    #[error("Email was not available.")]
    MissingEmail,

    #[error("Your account has been blocked by an administrator")]
    UserBlocked,

    #[error("Authentication required")]
    AuthenticationRequired,

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },

    // Network/HTTP errors
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Provider communication timeout")]
    Timeout,
}

// Conversion from reqwest errors
impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Timeout
        } else {
            AuthError::HttpError(err.to_string())
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AuthError::JwtError(err.to_string())
    }
}

// HTTP status code mapping for error responses
impl AuthError {
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidToken(_)
            | AuthError::JwtError(_)
            | AuthError::AuthenticationRequired => 401,

            AuthError::UserBlocked => 403,

            AuthError::UnsupportedProvider(_) => 404,

            AuthError::DuplicateProvider(_)
            | AuthError::ConfigError(_)
            | AuthError::InvalidConfig { .. } => 500,

            AuthError::Timeout => 504,

            _ => 400,
        }
    }

    /// Short machine-readable name used in JSON error bodies.
    pub fn name(&self) -> &'static str {
        match self.status_code() {
            401 => "UnauthorizedError",
            403 => "ForbiddenError",
            404 => "NotFoundError",
            500 | 504 => "ApplicationError",
            _ => "ValidationError",
        }
    }
}
