// ============================
// crates/backend-lib/src/auth/credential.rs
// ============================
//! Stored identities and the store they live in.
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::{collections::BTreeSet, fmt, sync::Arc};

use crate::error::AuthError;

/// A registered identity: identifier, hashed secret and flat role tags
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub identifier: String,
    /// PHC-format one-way hash; the plaintext is never kept
    pub secret_hash: String,
    pub roles: BTreeSet<String>,
}

impl Credential {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret_hash", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

/// Storage backend for credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, identifier: &str) -> Result<Option<Credential>, AuthError>;

    /// Insert a credential; fails with `DuplicateIdentifier` if the
    /// identifier is taken. Never overwrites.
    async fn put(&self, credential: Credential) -> Result<(), AuthError>;

    /// Remove a credential. Returns whether one was removed.
    async fn delete(&self, identifier: &str) -> Result<bool, AuthError>;
}

/// In-memory credential store
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    users: Arc<DashMap<String, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, identifier: &str) -> Result<Option<Credential>, AuthError> {
        Ok(self.users.get(identifier).map(|entry| entry.value().clone()))
    }

    async fn put(&self, credential: Credential) -> Result<(), AuthError> {
        match self.users.entry(credential.identifier.clone()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateIdentifier(credential.identifier)),
            Entry::Vacant(slot) => {
                slot.insert(credential);
                Ok(())
            },
        }
    }

    async fn delete(&self, identifier: &str) -> Result<bool, AuthError> {
        Ok(self.users.remove(identifier).is_some())
    }
}
