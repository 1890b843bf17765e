// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Server-side sessions and the store they live in.
use async_trait::async_trait;
use dashmap::DashMap;
use std::{
    fmt,
    sync::Arc,
    time::{Duration, SystemTime},
};

use super::token_generator::generate_secure_token;
use crate::error::AuthError;

/// Default session TTL (time to live)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60); // 30 minutes

/// A session binds an opaque token to an authenticated identifier
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identifier: String,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl Session {
    /// Create a session with a freshly generated token
    pub fn new(identifier: impl Into<String>, ttl: Duration) -> Self {
        let now = SystemTime::now();
        Self {
            token: generate_secure_token(),
            identifier: identifier.into(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("identifier", &self.identifier)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Storage backend for sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a session by token, expired or not
    async fn get(&self, token: &str) -> Result<Option<Session>, AuthError>;

    /// Insert or replace a session
    async fn put(&self, session: Session) -> Result<(), AuthError>;

    /// Remove a session. Returns whether a session was removed.
    async fn delete(&self, token: &str) -> Result<bool, AuthError>;

    /// Remove every session expired at `now`. Returns the number removed.
    async fn purge_expired(&self, now: SystemTime) -> Result<usize, AuthError>;

    /// Number of stored sessions
    async fn count(&self) -> Result<usize, AuthError>;
}

/// In-memory session store.
///
/// `DashMap` shards its locks, so writers on different tokens do not block
/// each other and writers on the same token are serialized.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, token: &str) -> Result<Option<Session>, AuthError> {
        Ok(self.sessions.get(token).map(|entry| entry.value().clone()))
    }

    async fn put(&self, session: Session) -> Result<(), AuthError> {
        self.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.sessions.remove(token).is_some())
    }

    async fn purge_expired(&self, now: SystemTime) -> Result<usize, AuthError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before.saturating_sub(self.sessions.len()))
    }

    async fn count(&self) -> Result<usize, AuthError> {
        Ok(self.sessions.len())
    }
}
