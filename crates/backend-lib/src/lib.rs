// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core library for the form-login demo server.
//!
//! The interesting part lives in [`auth`]: credential verification, sessions
//! and the route access policy. Everything else is thin HTTP glue.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;

use std::sync::Arc;
use crate::auth::{
    AuthDecisionService, AuthOptions, AuthRateLimiter, AuthService, InMemoryCredentialStore,
    InMemorySessionStore,
};
use crate::config::Settings;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Settings
    pub settings: Arc<Settings>,
    /// Login throttling
    pub rate_limiter: Arc<AuthRateLimiter>,
}

impl AppState {
    /// Create a new application state around an existing auth service
    pub fn new(auth: Arc<dyn AuthService>, settings: Settings) -> Self {
        let rate_limiter = Arc::new(AuthRateLimiter::new(
            settings.rate_limit.max_attempts,
            settings.lockout_duration(),
        ));

        Self {
            auth,
            settings: Arc::new(settings),
            rate_limiter,
        }
    }

    /// Build in-memory stores and the auth service from settings, then
    /// register the configured seed users.
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let policy = settings.route_policy()?;
        let rules = policy.rules().len();
        let service = AuthDecisionService::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(InMemorySessionStore::new()),
            policy,
            AuthOptions {
                session_ttl: settings.session_ttl(),
                password_cost: settings.password_cost,
            },
        )?;

        for user in &settings.seed_users {
            service
                .register_credential(&user.identifier, &user.secret, user.roles.clone())
                .await?;
        }
        tracing::info!(
            seeded = settings.seed_users.len(),
            rules,
            "auth service ready"
        );

        Ok(Self::new(Arc::new(service), settings))
    }
}
