//! Token validation and scope enforcement for protected operations.
//!
//! Flow Overview (terminal on the first failure):
//! 1) Extract: a token must be presented.
//! 2) Decode: verify the signature with the key for the expected token kind and
//!    check expiry.
//! 3) Type check: the `type` claim must match the expected kind.
//! 4) Subject: `sub` must be non-empty and resolve to a stored identity.
//! 5) Scopes: the granted set must cover the required set.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::clock::Clock;
use super::error::{AuthError, Unauthenticated};
use super::keys::TokenKeys;
use super::scope::{Scope, ScopeSet};
use super::store::{Identity, IdentityStore, bounded};
use super::token::{self, Claims, TokenError, TokenKind};

/// Identity behind a valid access token, plus the scopes the token grants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub identity: Identity,
    pub scopes: ScopeSet,
}

/// Fail with `Forbidden` unless `granted` contains every scope in `required`.
///
/// # Errors
/// Returns [`AuthError::Forbidden`] when any required scope is missing.
pub fn require(granted: &ScopeSet, required: &ScopeSet) -> Result<(), AuthError> {
    if granted.covers(required) {
        Ok(())
    } else {
        debug!(
            granted = %granted,
            missing = ?granted.missing(required).map(Scope::as_str).collect::<Vec<_>>(),
            "missing required scopes"
        );
        Err(AuthError::Forbidden)
    }
}

#[derive(Debug)]
pub struct AccessGuard {
    keys: Arc<TokenKeys>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn IdentityStore>,
    lookup_timeout: Duration,
}

impl AccessGuard {
    #[must_use]
    pub fn new(
        keys: Arc<TokenKeys>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn IdentityStore>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            keys,
            clock,
            store,
            lookup_timeout,
        }
    }

    /// Steps 1-3 plus the non-empty subject check.
    ///
    /// # Errors
    /// Returns [`AuthError::Unauthenticated`] with the reason for the rejection.
    pub fn claims(&self, token: Option<&str>, expected: TokenKind) -> Result<Claims, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(Unauthenticated::MissingToken)?;

        let claims = token::decode(
            token,
            self.keys.verification_key(expected),
            self.clock.now(),
        )
        .map_err(|err| {
            debug!(kind = expected.as_str(), "token rejected: {err}");
            match err {
                TokenError::Expired => Unauthenticated::Expired,
                TokenError::InvalidSignature
                | TokenError::Encode(_)
                | TokenError::ExpiryOverflow => Unauthenticated::InvalidToken,
            }
        })?;

        if claims.kind != expected {
            debug!(
                expected = expected.as_str(),
                presented = claims.kind.as_str(),
                "wrong token type"
            );
            return Err(Unauthenticated::WrongTokenType.into());
        }

        if claims.sub.trim().is_empty() {
            return Err(Unauthenticated::InvalidPayload.into());
        }

        Ok(claims)
    }

    /// Step 4: load the identity named by a token subject.
    ///
    /// # Errors
    /// Returns [`AuthError::NotFound`] if the subject no longer exists, or
    /// [`AuthError::Unavailable`] if the store fails or times out.
    pub async fn resolve(&self, subject: &str) -> Result<Identity, AuthError> {
        bounded(self.lookup_timeout, self.store.find_by_username(subject))
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// Validate an access token and enforce `required`.
    ///
    /// An empty `required` set admits any authenticated identity.
    ///
    /// # Errors
    /// `Unauthenticated`, `NotFound` or `Forbidden`, in flow order.
    pub async fn authorize(
        &self,
        token: Option<&str>,
        required: &ScopeSet,
    ) -> Result<Principal, AuthError> {
        let claims = self.claims(token, TokenKind::Access)?;
        let identity = self.resolve(&claims.sub).await?;
        let scopes = claims.scope.unwrap_or_default();
        require(&scopes, required)?;
        Ok(Principal { identity, scopes })
    }

    /// Validate a refresh token and load its subject.
    ///
    /// # Errors
    /// `Unauthenticated` or `NotFound`.
    pub async fn authenticate_refresh(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.claims(Some(token), TokenKind::Refresh)?;
        self.resolve(&claims.sub).await
    }
}
