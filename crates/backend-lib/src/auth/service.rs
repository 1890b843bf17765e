// =============
// crates/backend-lib/src/auth/service.rs
// =============
//! The `AuthService` trait: the decision layer handlers and middleware talk to.
use async_trait::async_trait;
use std::collections::BTreeSet;

use super::{AccessDecision, Credential, Session};
use crate::error::AuthError;

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Hash `plaintext_secret` and store a new credential.
    async fn register_credential(
        &self,
        identifier: &str,
        plaintext_secret: &str,
        roles: BTreeSet<String>,
    ) -> Result<Credential, AuthError>;

    /// Check a submitted identifier/secret pair and open a session on success.
    async fn verify_credential(
        &self,
        identifier: &str,
        plaintext_secret: &str,
    ) -> Result<Session, AuthError>;

    /// Decide whether a request for `path` may proceed. Never fails.
    async fn evaluate_access(&self, path: &str, session_token: Option<&str>) -> AccessDecision;

    /// Drop a session. Unknown tokens are ignored.
    async fn invalidate_session(&self, session_token: &str);

    /// The live session for `session_token`, if any.
    async fn session(&self, session_token: &str) -> Option<Session>;
}
