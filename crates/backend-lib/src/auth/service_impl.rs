// =============
// crates/backend-lib/src/auth/service_impl.rs
// =============
use async_trait::async_trait;
use std::{collections::BTreeSet, sync::Arc, time::Duration, time::SystemTime};
use tracing::{debug, info, warn};

use super::{
    password::{hash_password, hash_password_secure, verify_password},
    AccessDecision, AccessRequirement, AuthService, Credential, CredentialStore, RoutePolicy,
    Session, SessionStore, DEFAULT_PASSWORD_COST, DEFAULT_SESSION_TTL,
};
use crate::error::AuthError;
use crate::metrics::{
    ACCESS_DENIED, ACCESS_REDIRECTED, LOGIN_FAILURE, LOGIN_SUCCESS, LOGOUT, SESSION_ACTIVE,
    SESSION_EXPIRED,
};

/// Tunables for [`AuthDecisionService`]
#[derive(Debug, Clone, Copy)]
pub struct AuthOptions {
    pub session_ttl: Duration,
    /// scrypt cost factor (log2 N)
    pub password_cost: u8,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            password_cost: DEFAULT_PASSWORD_COST,
        }
    }
}

/// Default [`AuthService`]: credential checks, sessions and route policy
/// over injected stores.
pub struct AuthDecisionService {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    policy: RoutePolicy,
    options: AuthOptions,
    /// Verified against when the identifier is unknown, so that path costs
    /// the same as a wrong secret.
    dummy_hash: Arc<str>,
}

impl AuthDecisionService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        policy: RoutePolicy,
        options: AuthOptions,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hash_password("unknown-identifier", options.password_cost)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        Ok(Self {
            credentials,
            sessions,
            policy,
            options,
            dummy_hash: dummy_hash.into(),
        })
    }

    async fn hash_blocking(&self, plaintext_secret: &str) -> Result<String, AuthError> {
        let mut plain = plaintext_secret.to_owned();
        let cost = self.options.password_cost;
        tokio::task::spawn_blocking(move || hash_password_secure(&mut plain, cost))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    async fn verify_blocking(hash: Arc<str>, plaintext_secret: &str) -> Result<bool, AuthError> {
        let plain = plaintext_secret.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&hash, &plain))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Live session for a token; expired sessions are removed on sight.
    async fn live_session(&self, session_token: Option<&str>) -> Option<Session> {
        let token = session_token?;
        let session = match self.sessions.get(token).await {
            Ok(session) => session?,
            Err(e) => {
                warn!(error = %e, "session lookup failed, treating request as anonymous");
                return None;
            },
        };

        if session.is_expired() {
            if let Err(e) = self.sessions.delete(token).await {
                warn!(error = %e, "failed to remove expired session");
            }
            ::metrics::counter!(SESSION_EXPIRED).increment(1);
            debug!(identifier = %session.identifier, "session expired");
            return None;
        }

        Some(session)
    }

    async fn has_role(&self, session: &Session, role: &str) -> bool {
        match self.credentials.get(&session.identifier).await {
            Ok(Some(credential)) => credential.has_role(role),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "credential lookup failed during role check");
                false
            },
        }
    }

    async fn record_active_sessions(&self) {
        if let Ok(count) = self.sessions.count().await {
            ::metrics::gauge!(SESSION_ACTIVE).set(count as f64);
        }
    }
}

#[async_trait]
impl AuthService for AuthDecisionService {
    async fn register_credential(
        &self,
        identifier: &str,
        plaintext_secret: &str,
        roles: BTreeSet<String>,
    ) -> Result<Credential, AuthError> {
        // Skip the hashing cost for the common duplicate case; `put` still
        // decides atomically.
        if self.credentials.get(identifier).await?.is_some() {
            return Err(AuthError::DuplicateIdentifier(identifier.to_string()));
        }

        let credential = Credential {
            identifier: identifier.to_string(),
            secret_hash: self.hash_blocking(plaintext_secret).await?,
            roles,
        };
        self.credentials.put(credential.clone()).await?;

        info!(identifier, roles = ?credential.roles, "credential registered");
        Ok(credential)
    }

    async fn verify_credential(
        &self,
        identifier: &str,
        plaintext_secret: &str,
    ) -> Result<Session, AuthError> {
        let stored = self.credentials.get(identifier).await?;

        let (hash, known): (Arc<str>, bool) = match &stored {
            Some(credential) => (Arc::from(credential.secret_hash.as_str()), true),
            None => (Arc::clone(&self.dummy_hash), false),
        };
        let matches = Self::verify_blocking(hash, plaintext_secret).await?;

        if !(known && matches) {
            ::metrics::counter!(LOGIN_FAILURE).increment(1);
            info!(identifier, "login failed");
            return Err(AuthError::InvalidCredential);
        }

        match self.sessions.purge_expired(SystemTime::now()).await {
            Ok(0) => {},
            Ok(removed) => debug!(removed, "purged expired sessions"),
            Err(e) => warn!(error = %e, "failed to purge expired sessions"),
        }

        let session = Session::new(identifier, self.options.session_ttl);
        self.sessions.put(session.clone()).await?;

        ::metrics::counter!(LOGIN_SUCCESS).increment(1);
        self.record_active_sessions().await;
        info!(identifier, "login succeeded");
        Ok(session)
    }

    async fn evaluate_access(&self, path: &str, session_token: Option<&str>) -> AccessDecision {
        let decision = match self.policy.requirement_for(path) {
            None => AccessDecision::Deny,
            Some(AccessRequirement::Public) => AccessDecision::Allow,
            Some(AccessRequirement::AuthenticatedOnly) => {
                match self.live_session(session_token).await {
                    Some(_) => AccessDecision::Allow,
                    None => AccessDecision::RedirectToLogin,
                }
            },
            Some(AccessRequirement::RoleRequired(role)) => {
                let allowed = match self.live_session(session_token).await {
                    Some(session) => self.has_role(&session, role).await,
                    None => false,
                };
                if allowed {
                    AccessDecision::Allow
                } else {
                    AccessDecision::Deny
                }
            },
        };

        match decision {
            AccessDecision::Deny => ::metrics::counter!(ACCESS_DENIED).increment(1),
            AccessDecision::RedirectToLogin => {
                ::metrics::counter!(ACCESS_REDIRECTED).increment(1)
            },
            AccessDecision::Allow => {},
        }
        debug!(path, ?decision, "access evaluated");
        decision
    }

    async fn invalidate_session(&self, session_token: &str) {
        match self.sessions.delete(session_token).await {
            Ok(true) => {
                ::metrics::counter!(LOGOUT).increment(1);
                self.record_active_sessions().await;
                info!("session invalidated");
            },
            Ok(false) => debug!("invalidate called for unknown session"),
            Err(e) => warn!(error = %e, "failed to invalidate session"),
        }
    }

    async fn session(&self, session_token: &str) -> Option<Session> {
        self.live_session(Some(session_token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        InMemoryCredentialStore, InMemorySessionStore, RouteRule, MIN_PASSWORD_COST,
    };
    use scrypt::password_hash::PasswordHash;

    fn service_with_ttl(ttl: Duration) -> AuthDecisionService {
        let policy = RoutePolicy::new(vec![
            RouteRule::public("/").unwrap(),
            RouteRule::authenticated("/result").unwrap(),
            RouteRule::role("/admin/**", "ADMIN").unwrap(),
        ]);
        AuthDecisionService::new(
            Arc::new(InMemoryCredentialStore::new()),
            Arc::new(InMemorySessionStore::new()),
            policy,
            AuthOptions {
                session_ttl: ttl,
                password_cost: MIN_PASSWORD_COST,
            },
        )
        .unwrap()
    }

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|r| r.to_string()).collect()
    }

    #[tokio::test]
    async fn test_register_hashes_secret() {
        let service = service_with_ttl(DEFAULT_SESSION_TTL);
        let credential = service
            .register_credential("sample", "1234", roles(&["ADMIN"]))
            .await
            .unwrap();

        assert_eq!(credential.identifier, "sample");
        assert_ne!(credential.secret_hash, "1234");
        assert!(!credential.secret_hash.contains("1234"));
        assert!(verify_password(&credential.secret_hash, "1234"));
    }

    #[test]
    fn test_dummy_hash_uses_configured_cost() {
        let service = service_with_ttl(DEFAULT_SESSION_TTL);
        let parsed = PasswordHash::new(&service.dummy_hash).unwrap();

        assert_eq!(parsed.algorithm.as_str(), "scrypt");
        assert_eq!(
            parsed.params.get_decimal("ln"),
            Some(u32::from(MIN_PASSWORD_COST))
        );
        assert!(!verify_password(&service.dummy_hash, ""));
    }

    #[tokio::test]
    async fn test_register_duplicate_fails() {
        let service = service_with_ttl(DEFAULT_SESSION_TTL);
        service
            .register_credential("sample", "1234", roles(&[]))
            .await
            .unwrap();

        let err = service
            .register_credential("sample", "other", roles(&[]))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::DuplicateIdentifier("sample".to_string()));
    }

    #[tokio::test]
    async fn test_role_required() {
        let service = service_with_ttl(DEFAULT_SESSION_TTL);
        service
            .register_credential("admin", "pw-admin", roles(&["ADMIN"]))
            .await
            .unwrap();
        service
            .register_credential("user", "pw-user", roles(&["USER"]))
            .await
            .unwrap();

        let admin = service.verify_credential("admin", "pw-admin").await.unwrap();
        let user = service.verify_credential("user", "pw-user").await.unwrap();

        assert_eq!(
            service.evaluate_access("/admin/panel", Some(&admin.token)).await,
            AccessDecision::Allow
        );
        assert_eq!(
            service.evaluate_access("/admin/panel", Some(&user.token)).await,
            AccessDecision::Deny
        );
        assert_eq!(
            service.evaluate_access("/admin/panel", None).await,
            AccessDecision::Deny
        );
    }

    #[tokio::test]
    async fn test_expired_session_is_absent() {
        let service = service_with_ttl(Duration::ZERO);
        service
            .register_credential("sample", "1234", roles(&[]))
            .await
            .unwrap();
        let session = service.verify_credential("sample", "1234").await.unwrap();

        assert_eq!(
            service.evaluate_access("/result", Some(&session.token)).await,
            AccessDecision::RedirectToLogin
        );
        assert!(service.session(&session.token).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_path_is_denied() {
        let service = service_with_ttl(DEFAULT_SESSION_TTL);
        assert_eq!(
            service.evaluate_access("/favicon.ico", None).await,
            AccessDecision::Deny
        );
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let service = service_with_ttl(DEFAULT_SESSION_TTL);
        service.invalidate_session("never-issued").await;

        service
            .register_credential("sample", "1234", roles(&[]))
            .await
            .unwrap();
        let session = service.verify_credential("sample", "1234").await.unwrap();
        service.invalidate_session(&session.token).await;
        service.invalidate_session(&session.token).await;
        assert!(service.session(&session.token).await.is_none());
    }
}
