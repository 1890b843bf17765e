// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication and authorization.
//!
//! [`AuthDecisionService`] owns credential verification, session lifecycle
//! and route policy evaluation. Storage is injected through the
//! [`CredentialStore`] and [`SessionStore`] traits.

pub mod credential;
pub mod password;
pub mod policy;
pub mod rate_limit;
pub mod session;
pub mod token_generator;
mod service;
mod service_impl;

pub use credential::{Credential, CredentialStore, InMemoryCredentialStore};
pub use password::{hash_password, verify_password, DEFAULT_PASSWORD_COST, MIN_PASSWORD_COST};
pub use policy::{AccessDecision, AccessRequirement, PathPattern, RoutePolicy, RouteRule};
pub use rate_limit::AuthRateLimiter;
pub use session::{InMemorySessionStore, Session, SessionStore, DEFAULT_SESSION_TTL};
pub use service::AuthService;
pub use service_impl::{AuthDecisionService, AuthOptions};
