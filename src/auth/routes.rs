/// Authentication Routes
///
/// HTTP handlers for the OAuth2 login flow: connect (redirect to the
/// provider), the callback exchange the frontend calls with the provider's
/// redirect query, and the current-user lookup.
use crate::auth::manager::CallbackParams;
use crate::auth::{AuthError, AuthManager};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub data: Option<()>,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub status: u16,
    pub name: &'static str,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            data: None,
            error: ErrorDetail {
                status,
                name: self.name(),
                message: self.to_string(),
            },
        };

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
        (status, Json(body)).into_response()
    }
}

/// Extract a bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Start OAuth2 login flow - redirects to provider
async fn connect(
    State(auth_manager): State<Arc<AuthManager>>,
    Path(provider): Path<String>,
) -> Result<Redirect, AuthError> {
    let auth_url = auth_manager.connect_url(&provider)?;
    Ok(Redirect::temporary(&auth_url))
}

/// Handle the provider redirect forwarded by the frontend
async fn oauth_callback(
    State(auth_manager): State<Arc<AuthManager>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AuthError> {
    match auth_manager.callback(&provider, params).await {
        Ok(session) => Ok(Json(session).into_response()),
        Err(e) => {
            tracing::warn!("Login via {} failed: {}", provider, e);
            Err(e)
        }
    }
}

/// Current user for the session JWT
async fn me(
    State(auth_manager): State<Arc<AuthManager>>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let token = bearer_token(&headers).ok_or(AuthError::AuthenticationRequired)?;
    let user = auth_manager.current_user(token)?;
    Ok(Json(user).into_response())
}

/// Create authentication router with all routes
pub fn create_auth_router(auth_manager: Arc<AuthManager>) -> Router {
    Router::new()
        .route("/api/connect/{provider}", get(connect))
        .route("/api/auth/{provider}/callback", get(oauth_callback))
        .route("/api/users/me", get(me))
        .with_state(auth_manager)
}
