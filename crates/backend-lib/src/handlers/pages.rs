// ============================
// crates/backend-lib/src/handlers/pages.rs
// ============================
//! Landing and post-login pages.
use axum::{
    extract::State,
    http::Uri,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::{escape_html, layout};
use crate::error::AppError;
use crate::AppState;

/// `GET /` and `GET /index`
pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    let login = &state.settings.login;
    let signed_in = match jar.get(&state.settings.cookie_name) {
        Some(cookie) => state.auth.session(cookie.value()).await,
        None => None,
    };

    let account = match signed_in {
        Some(session) => format!(
            "<p>Signed in as <strong>{}</strong>.</p>\n<form method=\"post\" action=\"{}\"><button type=\"submit\">Log out</button></form>",
            escape_html(&session.identifier),
            escape_html(&login.logout_path),
        ),
        None => format!(
            "<p><a href=\"{}\">Log in</a></p>",
            escape_html(&login.login_path)
        ),
    };

    Html(layout(
        "Home",
        &format!(
            "<h1>Home</h1>\n<p>This page is open to everyone.</p>\n<p><a href=\"{}\">Members page</a></p>\n{account}",
            escape_html(&login.success_path)
        ),
    ))
}

/// `GET /result`
pub async fn result(State(state): State<AppState>, jar: CookieJar) -> Response {
    let login = &state.settings.login;
    let session = match jar.get(&state.settings.cookie_name) {
        Some(cookie) => state.auth.session(cookie.value()).await,
        None => None,
    };

    // The session can expire between the access check and here
    let Some(session) = session else {
        return Redirect::to(&login.login_path).into_response();
    };

    Html(layout(
        "Welcome",
        &format!(
            "<h1>Login succeeded</h1>\n<p>Welcome, <strong>{}</strong>.</p>\n<form method=\"post\" action=\"{}\"><button type=\"submit\">Log out</button></form>\n<p><a href=\"/\">Home</a></p>",
            escape_html(&session.identifier),
            escape_html(&login.logout_path),
        ),
    ))
    .into_response()
}

/// Paths the policy lets through but no route serves
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
