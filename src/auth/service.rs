//! Register, login, refresh and authorize entry points.
//!
//! Flow Overview:
//! - register: validate input, hash the password, insert, issue a pair.
//! - login: look the user up, verify the password (or a decoy when the user does
//!   not exist), issue a pair.
//! - refresh: validate the refresh token, reload the identity, re-derive scopes from
//!   its current role, issue a new pair. The old refresh token stays valid until it
//!   expires; nothing is revoked.
//! - authorize: delegate to the access guard.
//!
//! Security boundaries: passwords and raw tokens are never logged, and login
//! failures never reveal whether the username exists.

use anyhow::anyhow;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::clock::Clock;
use super::error::{AuthError, Unauthenticated};
use super::guard::{AccessGuard, Principal};
use super::issuer::{TokenIssuer, TokenPair, TokenTtl};
use super::keys::TokenKeys;
use super::password::{HashCost, PasswordHasher};
use super::scope::{Role, ScopeSet, scopes_for};
use super::store::{Identity, IdentityStore, NewIdentity, bounded};

const MAX_USERNAME_CHARS: usize = 50;
const MAX_PASSWORD_BYTES: usize = 1024;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    ttl: TokenTtl,
    hash_cost: HashCost,
    lookup_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            ttl: TokenTtl::default(),
            hash_cost: HashCost::default(),
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: TokenTtl) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_hash_cost(mut self, hash_cost: HashCost) -> Self {
        self.hash_cost = hash_cost;
        self
    }

    #[must_use]
    pub const fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    #[must_use]
    pub const fn ttl(&self) -> TokenTtl {
        self.ttl
    }

    #[must_use]
    pub const fn hash_cost(&self) -> HashCost {
        self.hash_cost
    }

    #[must_use]
    pub const fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }
}

/// Usernames: 1-50 characters, no whitespace.
pub(crate) fn valid_username(username: &str) -> bool {
    username.chars().count() <= MAX_USERNAME_CHARS
        && Regex::new(r"^\S+$").is_ok_and(|regex| regex.is_match(username))
}

pub(crate) fn valid_password(password: &str) -> bool {
    !password.is_empty() && password.len() <= MAX_PASSWORD_BYTES
}

#[derive(Debug)]
pub struct AuthService {
    hasher: Arc<PasswordHasher>,
    issuer: TokenIssuer,
    guard: AccessGuard,
    store: Arc<dyn IdentityStore>,
    lookup_timeout: Duration,
}

impl AuthService {
    /// # Errors
    /// Returns an error if the password hashing parameters are invalid.
    pub fn new(
        keys: TokenKeys,
        config: &AuthConfig,
        store: Arc<dyn IdentityStore>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let keys = Arc::new(keys);
        let hasher = Arc::new(PasswordHasher::new(config.hash_cost())?);
        let issuer = TokenIssuer::new(keys.clone(), config.ttl(), clock.clone());
        let guard = AccessGuard::new(keys, clock, store.clone(), config.lookup_timeout());
        Ok(Self {
            hasher,
            issuer,
            guard,
            store,
            lookup_timeout: config.lookup_timeout(),
        })
    }

    #[must_use]
    pub const fn ttl(&self) -> TokenTtl {
        self.issuer.ttl()
    }

    /// Create an identity and return its first token pair.
    ///
    /// # Errors
    /// `Invalid` for a malformed username/password, `Conflict` if the username is
    /// taken, `Unavailable` if the store fails.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<TokenPair, AuthError> {
        if !valid_username(username) {
            return Err(AuthError::Invalid("invalid username".to_string()));
        }
        if !valid_password(password) {
            return Err(AuthError::Invalid("invalid password".to_string()));
        }

        let password_hash = self.hash_password(password).await?;
        let identity = bounded(
            self.lookup_timeout,
            self.store.insert(NewIdentity {
                username: username.to_string(),
                password_hash,
                role,
            }),
        )
        .await
        .inspect_err(|err| warn!("registration rejected: {err}"))?;

        info!(user_id = identity.id, role = %identity.role, "user registered");
        self.issue_for(&identity)
    }

    /// Exchange a username and password for a token pair.
    ///
    /// # Errors
    /// `Unauthenticated(BadCredentials)` for an unknown user, a wrong password or
    /// a password no registration could have accepted; `Unavailable` if the store
    /// fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        // Rejected before the lookup, so the outcome is the same for every username.
        if !valid_password(password) {
            info!("login failed");
            return Err(Unauthenticated::BadCredentials.into());
        }

        let found = bounded(self.lookup_timeout, self.store.find_by_username(username)).await?;

        let matched = match &found {
            Some(identity) => {
                self.verify_password(password, Some(identity.password_hash.clone()))
                    .await?
            }
            None => self.verify_password(password, None).await?,
        };

        match found {
            Some(identity) if matched => {
                info!(user_id = identity.id, "login succeeded");
                self.issue_for(&identity)
            }
            _ => {
                info!("login failed");
                Err(Unauthenticated::BadCredentials.into())
            }
        }
    }

    /// Exchange a refresh token for a new pair with freshly derived scopes.
    ///
    /// # Errors
    /// `Unauthenticated` for an expired/invalid/wrong-type token, `NotFound` if the
    /// subject was deleted.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let identity = self.guard.authenticate_refresh(refresh_token).await?;
        info!(user_id = identity.id, "token refreshed");
        self.issue_for(&identity)
    }

    /// Validate an access token and enforce `required`.
    ///
    /// # Errors
    /// `Unauthenticated`, `NotFound` or `Forbidden`.
    #[instrument(skip(self, token))]
    pub async fn authorize(
        &self,
        token: Option<&str>,
        required: &ScopeSet,
    ) -> Result<Principal, AuthError> {
        self.guard.authorize(token, required).await
    }

    fn issue_for(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        self.issuer
            .issue_pair(&identity.username, scopes_for(identity.role))
            .map_err(|err| AuthError::Internal(err.into()))
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = SecretString::from(password.to_string());
        tokio::task::spawn_blocking(move || hasher.hash(password.expose_secret()))
            .await
            .map_err(|err| AuthError::Internal(anyhow!(err)))?
            .map_err(AuthError::Internal)
    }

    /// Verify against `stored_hash`, or against the decoy when there is none.
    async fn verify_password(
        &self,
        password: &str,
        stored_hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = SecretString::from(password.to_string());
        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(password.expose_secret(), &hash),
            None => {
                hasher.verify_decoy(password.expose_secret());
                false
            }
        })
        .await
        .map_err(|err| AuthError::Internal(anyhow!(err)))
    }
}
