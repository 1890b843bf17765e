// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::{login, pages};
use crate::middleware::enforce_access;
use crate::AppState;

/// Create the application router.
///
/// The access filter wraps every route and the fallback, so a path with no
/// matching policy rule is denied before routing even for unknown URLs.
pub fn create_router(state: AppState) -> Router {
    let login_path = state.settings.login.login_path.clone();
    let logout_path = state.settings.login.logout_path.clone();

    Router::new()
        .route("/", get(pages::index))
        .route("/index", get(pages::index))
        .route("/result", get(pages::result))
        .route(&login_path, get(login::login_form).post(login::login))
        .route(&logout_path, get(login::logout).post(login::logout))
        .fallback(pages::not_found)
        .layer(from_fn_with_state(state.clone(), enforce_access))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
