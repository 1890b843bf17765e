// crates/backend-lib/src/middleware/access.rs

//! Request filter applying the route access policy.
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Extensions, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::net::SocketAddr;

use crate::auth::AccessDecision;
use crate::error::AppError;
use crate::AppState;

/// Evaluate every request against the route policy before it reaches a
/// handler. Anonymous requests to protected pages are sent to the login
/// page; everything else that is not allowed gets a 403.
pub async fn enforce_access(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let token = jar
        .get(&state.settings.cookie_name)
        .map(|cookie| cookie.value().to_owned());

    match state
        .auth
        .evaluate_access(request.uri().path(), token.as_deref())
        .await
    {
        AccessDecision::Allow => next.run(request).await,
        AccessDecision::RedirectToLogin => {
            Redirect::to(&state.settings.login.login_path).into_response()
        },
        AccessDecision::Deny => AppError::Forbidden.into_response(),
    }
}

/// Key identifying a client for login throttling: the peer address, or
/// `x-real-ip` when `trust_proxy_headers` says a proxy sets it.
pub fn client_key(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_proxy_headers: bool,
) -> String {
    let forwarded = trust_proxy_headers
        .then(|| headers.get("x-real-ip"))
        .flatten()
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned);

    forwarded
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
