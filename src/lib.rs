use axum::http::{HeaderValue, Method, header};
use axum::{Json, Router, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod auth;
pub mod client;
pub mod config;
pub mod logging;

use auth::providers::feedforward;
use auth::{AuthManager, HttpApiRequester, InMemoryProviderRegistry, InMemoryUserStore};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    git_sha: Option<&'static str>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        git_sha: option_env!("VERGEN_GIT_SHA"),
    })
}

/// Builds the auth manager, registering every provider. Registration
/// failure is returned to the caller and aborts startup.
pub fn build_auth_manager(config: &config::Config) -> anyhow::Result<Arc<AuthManager>> {
    config.auth.validate()?;

    let registry = Arc::new(InMemoryProviderRegistry::with_stored_grants(
        config.auth.providers.clone(),
    ));
    feedforward::register(
        registry.as_ref(),
        &config.auth.feedforward_origin,
        &config.auth.callback_url,
    )?;

    let http_client = reqwest::Client::new();
    let manager = AuthManager::new(
        &config.auth,
        registry,
        Arc::new(HttpApiRequester::new(http_client.clone())),
        Arc::new(InMemoryUserStore::new()),
        http_client,
    );

    Ok(Arc::new(manager))
}

/// Builds the application router
pub fn build_router(config: &config::Config, auth_manager: Arc<AuthManager>) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match config.server.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => warn!(
            "Ignoring invalid frontend_url {} for CORS: {}",
            config.server.frontend_url, e
        ),
    }

    Router::new()
        .route("/health", get(health))
        .merge(auth::routes::create_auth_router(auth_manager))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Starts the web server with custom configuration.
///
/// Returns the bound port once the listener is up; the server runs in a
/// background task until `shutdown_rx` fires.
pub async fn start_server_with_config(
    config: config::Config,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> anyhow::Result<u16> {
    let auth_manager = build_auth_manager(&config)?;
    let app = build_router(&config, auth_manager);

    let listener = tokio::net::TcpListener::bind(config.server_addr()).await?;
    let port = listener.local_addr()?.port();
    info!("Server listening on {}:{}", config.server.host, port);

    tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await;

        if let Err(e) = result {
            tracing::error!("server error: {}", e);
        }
        info!("Server stopped");
    });

    Ok(port)
}
