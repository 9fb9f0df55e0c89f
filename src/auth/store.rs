//! Identity store contract and an in-memory implementation.
//!
//! The core only needs two operations: look an identity up by username and insert a
//! new one. Username uniqueness is the store's job.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use super::scope::Role;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct NewIdentity {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists")]
    Conflict,
    #[error("identity store timed out after {0:?}")]
    Timeout(Duration),
    #[error("identity store error")]
    Backend(#[source] anyhow::Error),
}

/// Bound a store call; the store itself owns any retry policy.
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}

#[async_trait]
pub trait IdentityStore: std::fmt::Debug + Send + Sync {
    /// Find an identity by its exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError>;

    /// Insert a new identity, failing with [`StoreError::Conflict`] if the username
    /// is taken.
    async fn insert(&self, identity: NewIdentity) -> Result<Identity, StoreError>;
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<String, Identity>>,
    next_id: AtomicI64,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop an identity. Tokens already issued to it stop resolving.
    pub async fn remove(&self, username: &str) -> Option<Identity> {
        self.users.write().await.remove(username)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn insert(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&identity.username) {
            return Err(StoreError::Conflict);
        }
        let stored = Identity {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            username: identity.username,
            password_hash: identity.password_hash,
            role: identity.role,
        };
        users.insert(stored.username.clone(), stored.clone());
        Ok(stored)
    }
}
