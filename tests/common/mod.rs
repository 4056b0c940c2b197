#![allow(dead_code)]

use axum::{
    Form, Json, Router,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use contenthub::{config, start_server_with_config};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const USERINFO_BOB: &str = r#"{
    "sub": "327228358788124163",
    "name": "bob",
    "preferred_username": "bob",
    "email": "b@example.com",
    "email_verified": true
}"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().compact())
        .try_init();
}

async fn spawn(app: Router) -> anyhow::Result<(u16, oneshot::Sender<()>)> {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let port = listener.local_addr()?.port();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed to start");
    });

    Ok((port, shutdown_tx))
}

/// Identity provider state shared with the handlers
#[derive(Default)]
pub struct ProviderState {
    /// Userinfo body; `None` makes the endpoint answer 500
    pub userinfo: Mutex<Option<Value>>,
    /// Access tokens presented at the userinfo endpoint
    pub seen_tokens: Mutex<Vec<String>>,
    /// Token requests as received
    pub token_requests: Mutex<Vec<HashMap<String, String>>>,
}

/// Mock OAuth2/OIDC provider with the token and userinfo endpoints
pub struct MockProvider {
    pub port: u16,
    pub state: Arc<ProviderState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

async fn token_endpoint(
    State(state): State<Arc<ProviderState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.lock().unwrap().push(form.clone());

    match form.get("code").map(String::as_str) {
        Some("bad-code") | None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response(),
        Some(code) => Json(json!({
            "access_token": format!("access-{}", code),
            "token_type": "Bearer",
            "expires_in": 43199,
            "id_token": "unused"
        }))
        .into_response(),
    }
}

async fn userinfo_endpoint(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    state.seen_tokens.lock().unwrap().push(token.to_string());

    match state.userinfo.lock().unwrap().clone() {
        Some(body) => Json(body).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
    }
}

impl MockProvider {
    pub async fn start(userinfo: Option<Value>) -> anyhow::Result<Self> {
        let state = Arc::new(ProviderState {
            userinfo: Mutex::new(userinfo),
            ..Default::default()
        });

        let app = Router::new()
            .route("/oauth/v2/token", post(token_endpoint))
            .route("/oidc/v1/userinfo", get(userinfo_endpoint))
            .with_state(state.clone());

        let (port, shutdown_tx) = spawn(app).await?;
        Ok(Self {
            port,
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn origin(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn set_userinfo(&self, body: Option<Value>) {
        *self.state.userinfo.lock().unwrap() = body;
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Content hub backend wired to a mock provider
pub struct TestServer {
    pub port: u16,
    pub provider: MockProvider,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start(userinfo: Option<Value>) -> anyhow::Result<Self> {
        init_tracing();
        let provider = MockProvider::start(userinfo).await?;

        let mut test_config = config::Config::test_config_with_port(0);
        test_config.auth.feedforward_origin = provider.origin();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let port = start_server_with_config(test_config, shutdown_rx).await?;

        Ok(Self {
            port,
            provider,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Follow `/api/connect/feedforward` and return the issued `state`
    pub async fn begin_login(&self) -> anyhow::Result<String> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let response = client
            .get(format!("{}/api/connect/feedforward", self.base_url()))
            .send()
            .await?;

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| anyhow::anyhow!("no redirect from connect"))?;

        let url = url::Url::parse(location)?;
        url.query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .ok_or_else(|| anyhow::anyhow!("no state in {}", location))
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Canned backend callback endpoint that records each request
#[derive(Default)]
pub struct BackendState {
    pub response: Mutex<(u16, String)>,
    /// `path?query` of every callback request
    pub requests: Mutex<Vec<String>>,
}

pub struct MockBackend {
    pub port: u16,
    pub state: Arc<BackendState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

async fn backend_callback(
    State(state): State<Arc<BackendState>>,
    Path(provider): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let path = format!("/api/auth/{}/callback", provider);
    let entry = match query {
        Some(q) => format!("{}?{}", path, q),
        None => path,
    };
    state.requests.lock().unwrap().push(entry);

    let (status, body) = state.response.lock().unwrap().clone();
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

impl MockBackend {
    pub async fn start(status: u16, body: &str) -> anyhow::Result<Self> {
        let state = Arc::new(BackendState {
            response: Mutex::new((status, body.to_string())),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/auth/{provider}/callback", get(backend_callback))
            .with_state(state.clone());

        let (port, shutdown_tx) = spawn(app).await?;
        Ok(Self {
            port,
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
