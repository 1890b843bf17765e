// ============================
// crates/backend-lib/src/handlers/login.rs
// ============================
//! Form login and logout.
//!
//! Field names and redirect targets come from [`crate::config::LoginSettings`].
use axum::{
    extract::{Query, State},
    http::{Extensions, HeaderMap},
    response::{Html, Redirect},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::collections::HashMap;
use tracing::{info, warn};

use super::{escape_html, layout};
use crate::error::{AppError, AuthError};
use crate::middleware::client_key;
use crate::AppState;

/// `GET /login`: the login form. `?error` and `?locked` add a notice.
pub async fn login_form(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<String> {
    let login = &state.settings.login;

    let notice = if params.contains_key("locked") {
        "<p role=\"alert\">Too many failed attempts. Try again later.</p>\n"
    } else if params.contains_key("error") {
        "<p role=\"alert\">Invalid username or password.</p>\n"
    } else {
        ""
    };

    Html(layout(
        "Log in",
        &format!(
            "<h1>Log in</h1>\n{notice}<form method=\"post\" action=\"{action}\">\n\
             <p><label>Username <input type=\"text\" name=\"{user}\" autofocus></label></p>\n\
             <p><label>Password <input type=\"password\" name=\"{pass}\"></label></p>\n\
             <p><button type=\"submit\">Log in</button></p>\n</form>",
            action = escape_html(&login.login_path),
            user = escape_html(&login.username_field),
            pass = escape_html(&login.password_field),
        ),
    ))
}

/// `POST /login`: verify the submitted form and open a session.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    jar: CookieJar,
    Form(form): Form<HashMap<String, String>>,
) -> Result<(CookieJar, Redirect), AppError> {
    let settings = &state.settings;
    let login = &settings.login;
    let client = client_key(&headers, &extensions, settings.trust_proxy_headers);

    if !state.rate_limiter.check_rate_limit(&client) {
        warn!(%client, "login rejected, client is locked out");
        return Ok((jar, Redirect::to(&format!("{}?locked", login.login_path))));
    }

    let identifier = form
        .get(&login.username_field)
        .map(String::as_str)
        .unwrap_or_default();
    let secret = form
        .get(&login.password_field)
        .map(String::as_str)
        .unwrap_or_default();

    match state.auth.verify_credential(identifier, secret).await {
        Ok(session) => {
            state.rate_limiter.record_success(&client);
            state.rate_limiter.cleanup();

            // A session from before the login is never carried over
            if let Some(previous) = jar.get(&settings.cookie_name) {
                state.auth.invalidate_session(previous.value()).await;
            }

            let cookie = Cookie::build((settings.cookie_name.clone(), session.token))
                .path("/")
                .http_only(true)
                .secure(settings.cookie_secure)
                .same_site(SameSite::Lax)
                .build();

            Ok((jar.add(cookie), Redirect::to(&login.success_path)))
        },
        Err(AuthError::InvalidCredential) => {
            state.rate_limiter.record_failed_attempt(&client);
            Ok((jar, Redirect::to(&login.failure_path())))
        },
        Err(e) => Err(e.into()),
    }
}

/// `GET|POST /logout`: drop the session and its cookie.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let settings = &state.settings;

    if let Some(cookie) = jar.get(&settings.cookie_name) {
        state.auth.invalidate_session(cookie.value()).await;
        info!("logged out");
    }

    let jar = jar.remove(Cookie::build((settings.cookie_name.clone(), "")).path("/"));
    (jar, Redirect::to(&settings.login.logout_success_path))
}
