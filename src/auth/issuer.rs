//! Access/refresh token minting.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::clock::Clock;
use super::keys::TokenKeys;
use super::scope::ScopeSet;
use super::token::{self, Claims, TokenError, TokenKind};

/// Result of register, login and refresh.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Upper bound for either TTL (100 years).
pub const MAX_TTL_SECONDS: i64 = 3_153_600_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenTtl {
    pub access_seconds: i64,
    pub refresh_seconds: i64,
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access_seconds: 900,
            refresh_seconds: 2_592_000,
        }
    }
}

impl TokenTtl {
    /// # Errors
    /// Returns an error unless both TTLs are within `1..=MAX_TTL_SECONDS` and
    /// refresh outlives access.
    pub fn new(access_seconds: i64, refresh_seconds: i64) -> Result<Self> {
        if access_seconds <= 0 || refresh_seconds <= 0 {
            return Err(anyhow!("token ttl must be positive"));
        }
        if access_seconds > MAX_TTL_SECONDS || refresh_seconds > MAX_TTL_SECONDS {
            return Err(anyhow!("token ttl must not exceed {MAX_TTL_SECONDS}s"));
        }
        if refresh_seconds <= access_seconds {
            return Err(anyhow!(
                "refresh token ttl ({refresh_seconds}s) must exceed access token ttl ({access_seconds}s)"
            ));
        }
        Ok(Self {
            access_seconds,
            refresh_seconds,
        })
    }
}

#[derive(Debug)]
pub struct TokenIssuer {
    keys: Arc<TokenKeys>,
    ttl: TokenTtl,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(keys: Arc<TokenKeys>, ttl: TokenTtl, clock: Arc<dyn Clock>) -> Self {
        Self { keys, ttl, clock }
    }

    #[must_use]
    pub const fn ttl(&self) -> TokenTtl {
        self.ttl
    }

    /// # Errors
    /// Returns an error if the expiry overflows or the claims cannot be encoded.
    pub fn issue_access(&self, subject: &str, scopes: ScopeSet) -> Result<String, TokenError> {
        let now = self.clock.now();
        let exp = expiry(now, self.ttl.access_seconds)?;
        let claims = Claims::access(subject, scopes, now, exp);
        token::encode(&claims, self.keys.signing_key(TokenKind::Access))
    }

    /// # Errors
    /// Returns an error if the expiry overflows or the claims cannot be encoded.
    pub fn issue_refresh(&self, subject: &str) -> Result<String, TokenError> {
        let now = self.clock.now();
        let exp = expiry(now, self.ttl.refresh_seconds)?;
        let claims = Claims::refresh(subject, now, exp);
        token::encode(&claims, self.keys.signing_key(TokenKind::Refresh))
    }

    /// # Errors
    /// Returns an error if either token cannot be encoded.
    pub fn issue_pair(&self, subject: &str, scopes: ScopeSet) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access(subject, scopes)?,
            refresh_token: self.issue_refresh(subject)?,
            expires_in: self.ttl.access_seconds,
        })
    }
}

fn expiry(now: i64, ttl_seconds: i64) -> Result<i64, TokenError> {
    now.checked_add(ttl_seconds).ok_or(TokenError::ExpiryOverflow)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::scope::{Role, scopes_for};
    use secrecy::SecretString;

    const NOW: i64 = 1_700_000_000;

    fn keys() -> Arc<TokenKeys> {
        Arc::new(
            TokenKeys::from_secrets(
                &SecretString::from("access-secret".to_string()),
                &SecretString::from("refresh-secret".to_string()),
            )
            .unwrap(),
        )
    }

    fn issuer(clock: Arc<ManualClock>) -> TokenIssuer {
        TokenIssuer::new(keys(), TokenTtl::new(60, 3600).unwrap(), clock)
    }

    #[test]
    fn access_token_carries_scopes_and_ttl() {
        let issuer = issuer(Arc::new(ManualClock::new(NOW)));
        let token = issuer.issue_access("alice", scopes_for(Role::User)).unwrap();
        let claims = token::decode(&token, b"access-secret", NOW).unwrap();
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + 60);
        assert_eq!(claims.scope, Some(scopes_for(Role::User)));
    }

    #[test]
    fn refresh_token_has_no_scopes_and_own_key() {
        let issuer = issuer(Arc::new(ManualClock::new(NOW)));
        let token = issuer.issue_refresh("alice").unwrap();
        assert!(matches!(
            token::decode(&token, b"access-secret", NOW),
            Err(TokenError::InvalidSignature)
        ));
        let claims = token::decode(&token, b"refresh-secret", NOW).unwrap();
        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.exp, NOW + 3600);
        assert!(claims.scope.is_none());
    }

    #[test]
    fn pair_reports_access_ttl() {
        let issuer = issuer(Arc::new(ManualClock::new(NOW)));
        let pair = issuer.issue_pair("alice", scopes_for(Role::Admin)).unwrap();
        assert_eq!(pair.expires_in, 60);
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn expiry_follows_the_clock() {
        let clock = Arc::new(ManualClock::new(NOW));
        let issuer = issuer(clock.clone());
        let first = issuer.issue_access("alice", ScopeSet::new()).unwrap();
        clock.advance(30);
        let second = issuer.issue_access("alice", ScopeSet::new()).unwrap();
        let exp = |t: &str| token::decode(t, b"access-secret", NOW).unwrap().exp;
        assert_eq!(exp(&second) - exp(&first), 30);
    }

    #[test]
    fn ttl_validation() {
        assert!(TokenTtl::new(0, 10).is_err());
        assert!(TokenTtl::new(10, -1).is_err());
        assert!(TokenTtl::new(10, 10).is_err());
        assert!(TokenTtl::new(900, 2_592_000).is_ok());
        assert!(TokenTtl::new(900, MAX_TTL_SECONDS).is_ok());
        assert!(TokenTtl::new(900, MAX_TTL_SECONDS + 1).is_err());
        assert!(TokenTtl::new(900, i64::MAX).is_err());
    }

    #[test]
    fn longest_ttl_yields_future_expiry() {
        let issuer = TokenIssuer::new(
            keys(),
            TokenTtl::new(900, MAX_TTL_SECONDS).unwrap(),
            Arc::new(ManualClock::new(NOW)),
        );
        let token = issuer.issue_refresh("alice").unwrap();
        let claims = token::decode(&token, b"refresh-secret", NOW).unwrap();
        assert_eq!(claims.exp, NOW + MAX_TTL_SECONDS);
    }

    #[test]
    fn expiry_overflow_is_an_error() {
        let issuer = issuer(Arc::new(ManualClock::new(i64::MAX - 100)));
        assert!(matches!(
            issuer.issue_refresh("alice"),
            Err(TokenError::ExpiryOverflow)
        ));
        assert!(matches!(
            issuer.issue_access("alice", ScopeSet::new()),
            Err(TokenError::ExpiryOverflow)
        ));
    }
}
