//! Session bootstrap
//!
//! Runs when the browser lands on the provider redirect page. The redirect
//! query is forwarded verbatim to the backend callback; on success the
//! returned token and user are stored and the user is sent home, on any
//! failure nothing is stored and the user is sent back to the login page.
//!
//! ```text
//! Anonymous -> Authenticating -> Authenticated
//!                     \
//!                      -> Error
//! ```

use reqwest::header;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::error::ClientError;
use super::guard::{HOME_ROUTE, LOGIN_ROUTE};
use super::session::SessionManager;

pub const LOADING_MESSAGE: &str = "Loading...";
pub const SUCCESS_MESSAGE: &str =
    "You have been successfully logged in. You will be redirected in a few seconds...";
pub const ERROR_MESSAGE: &str = "An error occurred during authentication. Please try again.";

pub const SUCCESS_REDIRECT_DELAY: Duration = Duration::from_secs(3);
pub const ERROR_REDIRECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Anonymous,
    Authenticating,
    Authenticated,
    Error,
}

impl LoginState {
    pub fn message(&self) -> &'static str {
        match self {
            LoginState::Anonymous | LoginState::Authenticating => LOADING_MESSAGE,
            LoginState::Authenticated => SUCCESS_MESSAGE,
            LoginState::Error => ERROR_MESSAGE,
        }
    }
}

/// Moves the user to another route
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// A navigation to run after a fixed delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRedirect {
    pub path: &'static str,
    pub delay: Duration,
}

impl ScheduledRedirect {
    /// Start the timer. It keeps running even if the user navigates away.
    pub fn spawn(self, navigator: Arc<dyn Navigator>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(self.delay).await;
            navigator.navigate(self.path);
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub state: LoginState,
    pub message: &'static str,
    pub redirect: ScheduledRedirect,
}

#[derive(Debug, Deserialize)]
struct CallbackResponse {
    jwt: String,
    user: serde_json::Value,
}

pub struct SessionBootstrap {
    backend_url: Option<String>,
    provider: String,
    http_client: reqwest::Client,
    session: SessionManager,
    state: LoginState,
    success_delay: Duration,
    error_delay: Duration,
}

impl SessionBootstrap {
    pub fn new(
        backend_url: Option<String>,
        provider: &str,
        session: SessionManager,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            backend_url,
            provider: provider.to_string(),
            http_client,
            session,
            state: LoginState::Anonymous,
            success_delay: SUCCESS_REDIRECT_DELAY,
            error_delay: ERROR_REDIRECT_DELAY,
        }
    }

    pub fn with_delays(mut self, success: Duration, error: Duration) -> Self {
        self.success_delay = success;
        self.error_delay = error;
        self
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Backend callback URL with the redirect query appended as-is
    pub fn callback_url(&self, query: &str) -> Result<String, ClientError> {
        let backend = self
            .backend_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(ClientError::MissingBackendUrl)?;

        let base = format!(
            "{}/api/auth/{}/callback",
            backend.trim_end_matches('/'),
            urlencoding::encode(&self.provider)
        );
        let query = query.strip_prefix('?').unwrap_or(query);

        let url = if query.is_empty() {
            base
        } else {
            format!("{}?{}", base, query)
        };

        url::Url::parse(&url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        Ok(url)
    }

    /// Handle the provider redirect. Runs at most once per bootstrap.
    pub async fn handle_redirect(&mut self, query: &str) -> Result<BootstrapOutcome, ClientError> {
        if self.state != LoginState::Anonymous {
            return Err(ClientError::InvalidTransition(format!("{:?}", self.state)));
        }
        self.state = LoginState::Authenticating;

        let redirect = match self.exchange(query).await {
            Ok(()) => {
                info!("Login via {} succeeded", self.provider);
                self.state = LoginState::Authenticated;
                ScheduledRedirect {
                    path: HOME_ROUTE,
                    delay: self.success_delay,
                }
            }
            Err(e) => {
                error!("Authentication error: {}", e);
                self.state = LoginState::Error;
                ScheduledRedirect {
                    path: LOGIN_ROUTE,
                    delay: self.error_delay,
                }
            }
        };

        Ok(BootstrapOutcome {
            state: self.state,
            message: self.state.message(),
            redirect,
        })
    }

    async fn exchange(&self, query: &str) -> Result<(), ClientError> {
        let url = self.callback_url(query)?;
        debug!("Forwarding provider redirect to {}", url);

        let response = self
            .http_client
            .get(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }

        let body: CallbackResponse = response.json().await?;
        self.session.set_auth_data(&body.jwt, &body.user.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::store::MemoryStore;
    use std::sync::Mutex;

    fn bootstrap(backend: Option<&str>) -> SessionBootstrap {
        SessionBootstrap::new(
            backend.map(str::to_string),
            "feedforward",
            SessionManager::new(Arc::new(MemoryStore::new())),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_callback_url_forwards_query_verbatim() {
        let b = bootstrap(Some("http://localhost:1337/"));
        assert_eq!(
            b.callback_url("code=abc&state=xyz").unwrap(),
            "http://localhost:1337/api/auth/feedforward/callback?code=abc&state=xyz"
        );
        assert_eq!(
            b.callback_url("?code=a%2Bb").unwrap(),
            "http://localhost:1337/api/auth/feedforward/callback?code=a%2Bb"
        );
        assert_eq!(
            b.callback_url("").unwrap(),
            "http://localhost:1337/api/auth/feedforward/callback"
        );
    }

    #[tokio::test]
    async fn test_missing_backend_url_is_error() {
        let mut b = bootstrap(None);
        assert_eq!(b.state(), LoginState::Anonymous);

        let outcome = b.handle_redirect("code=abc").await.unwrap();
        assert_eq!(outcome.state, LoginState::Error);
        assert_eq!(outcome.message, ERROR_MESSAGE);
        assert_eq!(
            outcome.redirect,
            ScheduledRedirect {
                path: "/auth/login",
                delay: Duration::from_secs(5)
            }
        );
    }

    #[tokio::test]
    async fn test_second_redirect_rejected() {
        let mut b = bootstrap(None);
        b.handle_redirect("code=abc").await.unwrap();

        let result = b.handle_redirect("code=abc").await;
        assert!(matches!(result, Err(ClientError::InvalidTransition(_))));
    }

    struct Recorder(Mutex<Vec<String>>);

    impl Navigator for Recorder {
        fn navigate(&self, path: &str) {
            self.0.lock().unwrap().push(path.to_string());
        }
    }

    #[tokio::test]
    async fn test_scheduled_redirect_navigates_after_delay() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let redirect = ScheduledRedirect {
            path: "/",
            delay: Duration::from_millis(20),
        };

        let handle = redirect.spawn(recorder.clone());
        assert!(recorder.0.lock().unwrap().is_empty());

        handle.await.unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec!["/"]);
    }

    #[test]
    fn test_state_messages() {
        assert_eq!(LoginState::Anonymous.message(), "Loading...");
        assert_eq!(LoginState::Authenticated.message(), SUCCESS_MESSAGE);
    }
}
