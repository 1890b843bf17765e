use super::*;
use crate::auth::{AccessDecision, AuthService, Credential, Session};
use crate::config::Settings;
use crate::error::AuthError;
use crate::AppState;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Extensions, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Decides by path and records the token it was asked about
#[derive(Default)]
struct StubAuth {
    seen_tokens: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl AuthService for StubAuth {
    async fn register_credential(
        &self,
        _identifier: &str,
        _plaintext_secret: &str,
        _roles: BTreeSet<String>,
    ) -> Result<Credential, AuthError> {
        Err(AuthError::Store("not supported".to_string()))
    }

    async fn verify_credential(
        &self,
        _identifier: &str,
        _plaintext_secret: &str,
    ) -> Result<Session, AuthError> {
        Err(AuthError::InvalidCredential)
    }

    async fn evaluate_access(&self, path: &str, session_token: Option<&str>) -> AccessDecision {
        self.seen_tokens
            .lock()
            .unwrap()
            .push(session_token.map(str::to_owned));
        match path {
            "/open" => AccessDecision::Allow,
            "/members" => AccessDecision::RedirectToLogin,
            _ => AccessDecision::Deny,
        }
    }

    async fn invalidate_session(&self, _session_token: &str) {}

    async fn session(&self, _session_token: &str) -> Option<Session> {
        None
    }
}

async fn ok_handler() -> &'static str {
    "Hello, World!"
}

fn app(auth: Arc<StubAuth>) -> Router {
    let state = AppState::new(auth, Settings::default());
    Router::new()
        .route("/open", get(ok_handler))
        .route("/members", get(ok_handler))
        .route("/closed", get(ok_handler))
        .layer(from_fn_with_state(state.clone(), enforce_access))
        .with_state(state)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_allow_reaches_handler() {
    let response = app(Arc::default()).oneshot(get_request("/open")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_redirect_to_login() {
    let response = app(Arc::default())
        .oneshot(get_request("/members"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn test_deny_is_forbidden() {
    let response = app(Arc::default()).oneshot(get_request("/closed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_session_cookie_is_forwarded() {
    let auth = Arc::new(StubAuth::default());
    let request = Request::builder()
        .uri("/open")
        .header(header::COOKIE, "other=1; SESSION=abc123")
        .body(Body::empty())
        .unwrap();

    app(Arc::clone(&auth)).oneshot(request).await.unwrap();
    app(Arc::clone(&auth)).oneshot(get_request("/open")).await.unwrap();

    let seen = auth.seen_tokens.lock().unwrap();
    assert_eq!(*seen, vec![Some("abc123".to_string()), None]);
}

#[test]
fn test_client_key_uses_peer_address_unless_proxy_trusted() {
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.7"));
    let mut extensions = Extensions::new();
    extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5555))));

    assert_eq!(client_key(&headers, &extensions, false), "10.0.0.1");
    assert_eq!(client_key(&headers, &extensions, true), "203.0.113.7");
    assert_eq!(client_key(&HeaderMap::new(), &extensions, true), "10.0.0.1");
    assert_eq!(client_key(&headers, &Extensions::new(), false), "unknown");
}
