mod common;

use common::{TestServer, USERINFO_BOB};
use contenthub::client::guard::{self, GuardDecision};
use contenthub::client::{
    ApiClient, LoginState, MemoryStore, SessionBootstrap, SessionManager, SessionStore,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn client_session() -> (Arc<MemoryStore>, SessionManager) {
    let store = Arc::new(MemoryStore::new());
    (store.clone(), SessionManager::new(store))
}

async fn callback_status(server: &TestServer, query: &str) -> (u16, Value) {
    let response = reqwest::get(format!(
        "{}/api/auth/feedforward/callback?{}",
        server.base_url(),
        query
    ))
    .await
    .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_full_login_flow() {
    let server = TestServer::start(Some(serde_json::from_str(USERINFO_BOB).unwrap()))
        .await
        .unwrap();
    let state = server.begin_login().await.unwrap();

    let (store, session) = client_session();
    let mut bootstrap = SessionBootstrap::new(
        Some(server.base_url()),
        "feedforward",
        session.clone(),
        reqwest::Client::new(),
    );

    let outcome = bootstrap
        .handle_redirect(&format!("code=abc&state={}", state))
        .await
        .unwrap();

    assert_eq!(outcome.state, LoginState::Authenticated);
    assert_eq!(outcome.redirect.path, "/");
    assert!(session.is_authenticated());

    let user = session.get_user().unwrap();
    assert_eq!(user.username.as_deref(), Some("bob"));
    assert_eq!(user.email.as_deref(), Some("b@example.com"));
    assert!(user.confirmed);
    assert!(store.get("user").unwrap().contains("createdAt"));

    // The provider saw the token issued for our code
    assert_eq!(
        *server.provider.state.seen_tokens.lock().unwrap(),
        vec!["access-abc"]
    );
    let token_request = server.provider.state.token_requests.lock().unwrap()[0].clone();
    assert_eq!(token_request["grant_type"], "authorization_code");
    assert_eq!(token_request["client_id"], "put_key_in_admin_panel");

    // Later API calls carry the token
    let api = ApiClient::new(&server.base_url(), session.clone(), reqwest::Client::new());
    let me: Value = api.get_json("/api/users/me").await.unwrap();
    assert_eq!(me["email"], "b@example.com");
    assert_eq!(me["provider"], "feedforward");

    assert_eq!(guard::check("/tiles", &session), GuardDecision::Allow);

    session.logout().unwrap();
    assert_eq!(
        guard::check("/tiles", &session),
        GuardDecision::Redirect("/auth/login")
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_second_login_reuses_user() {
    let server = TestServer::start(Some(serde_json::from_str(USERINFO_BOB).unwrap()))
        .await
        .unwrap();

    let first = server.begin_login().await.unwrap();
    let (status, body) = callback_status(&server, &format!("code=one&state={}", first)).await;
    assert_eq!(status, 200);

    let second = server.begin_login().await.unwrap();
    let (status, again) = callback_status(&server, &format!("code=two&state={}", second)).await;
    assert_eq!(status, 200);

    assert_eq!(body["user"]["id"], again["user"]["id"]);
    assert_ne!(body["jwt"], Value::Null);

    server.shutdown().await;
}

#[tokio::test]
async fn test_state_is_single_use() {
    let server = TestServer::start(Some(serde_json::from_str(USERINFO_BOB).unwrap()))
        .await
        .unwrap();
    let state = server.begin_login().await.unwrap();

    let (status, _) = callback_status(&server, &format!("code=abc&state={}", state)).await;
    assert_eq!(status, 200);

    let (status, body) = callback_status(&server, &format!("code=abc&state={}", state)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "Invalid OAuth2 state parameter");

    server.shutdown().await;
}

#[tokio::test]
async fn test_userinfo_failure_returns_fixed_message() {
    let server = TestServer::start(None).await.unwrap();
    let state = server.begin_login().await.unwrap();

    let (status, body) = callback_status(&server, &format!("code=abc&state={}", state)).await;

    assert_eq!(status, 400);
    assert_eq!(
        body["error"]["message"],
        "Login flow failed. Please contact the site administrator."
    );
    assert!(!body.to_string().contains("upstream exploded"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_missing_email_aborts_login() {
    let server = TestServer::start(Some(json!({ "sub": "1", "preferred_username": "nomail" })))
        .await
        .unwrap();
    let state = server.begin_login().await.unwrap();

    let (store, session) = client_session();
    let mut bootstrap = SessionBootstrap::new(
        Some(server.base_url()),
        "feedforward",
        session.clone(),
        reqwest::Client::new(),
    );
    let outcome = bootstrap
        .handle_redirect(&format!("code=abc&state={}", state))
        .await
        .unwrap();

    assert_eq!(outcome.state, LoginState::Error);
    assert_eq!(outcome.redirect.path, "/auth/login");
    assert!(store.get("jwt").is_none());
    assert!(store.get("user").is_none());

    server.shutdown().await;
}

#[tokio::test]
async fn test_code_exchange_failure() {
    let server = TestServer::start(Some(serde_json::from_str(USERINFO_BOB).unwrap()))
        .await
        .unwrap();
    let state = server.begin_login().await.unwrap();

    let (status, body) =
        callback_status(&server, &format!("code=bad-code&state={}", state)).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["name"], "ValidationError");
    assert!(server.provider.state.seen_tokens.lock().unwrap().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_provider_error_param() {
    let server = TestServer::start(None).await.unwrap();

    let (status, body) = callback_status(
        &server,
        "error=access_denied&error_description=User+cancelled",
    )
    .await;

    assert_eq!(status, 400);
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("access_denied")
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_unknown_provider_and_unauthenticated_me() {
    let server = TestServer::start(None).await.unwrap();

    let response = reqwest::get(format!("{}/api/connect/discord", server.base_url()))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = reqwest::get(format!("{}/api/users/me", server.base_url()))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    server.shutdown().await;
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start(None).await.unwrap();

    let body: Value = reqwest::get(format!("{}/health", server.base_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");

    server.shutdown().await;
}
