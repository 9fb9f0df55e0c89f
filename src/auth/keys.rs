//! Token signing and verification keys.
//!
//! There are four key roles: access signing, access verification, refresh signing
//! and refresh verification. HS256 is symmetric, so each pair is built from one
//! secret, but callers still ask for the role they need.

use anyhow::{Result, anyhow};
use secrecy::{ExposeSecret, SecretSlice, SecretString};

use super::token::TokenKind;

#[derive(Debug)]
pub struct KeyPair {
    signing: SecretSlice<u8>,
    verification: SecretSlice<u8>,
}

impl KeyPair {
    /// Build a pair where one secret serves both roles.
    #[must_use]
    pub fn symmetric(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            signing: SecretSlice::from(bytes.to_vec()),
            verification: SecretSlice::from(bytes.to_vec()),
        }
    }

    #[must_use]
    pub fn signing(&self) -> &[u8] {
        self.signing.expose_secret()
    }

    #[must_use]
    pub fn verification(&self) -> &[u8] {
        self.verification.expose_secret()
    }
}

/// Read-only key material for both token kinds.
#[derive(Debug)]
pub struct TokenKeys {
    access: KeyPair,
    refresh: KeyPair,
}

impl TokenKeys {
    /// # Errors
    ///
    /// Returns an error if a key is empty or if access and refresh tokens would be
    /// signed with the same key.
    pub fn new(access: KeyPair, refresh: KeyPair) -> Result<Self> {
        if access.signing().is_empty() || access.verification().is_empty() {
            return Err(anyhow!("access token key must not be empty"));
        }
        if refresh.signing().is_empty() || refresh.verification().is_empty() {
            return Err(anyhow!("refresh token key must not be empty"));
        }
        if access.signing() == refresh.signing() {
            return Err(anyhow!("access and refresh tokens must use distinct keys"));
        }
        Ok(Self { access, refresh })
    }

    /// Build keys from the two configured secrets.
    ///
    /// # Errors
    ///
    /// Same as [`TokenKeys::new`].
    pub fn from_secrets(access: &SecretString, refresh: &SecretString) -> Result<Self> {
        Self::new(KeyPair::symmetric(access), KeyPair::symmetric(refresh))
    }

    #[must_use]
    pub fn signing_key(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.access.signing(),
            TokenKind::Refresh => self.refresh.signing(),
        }
    }

    #[must_use]
    pub fn verification_key(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.access.verification(),
            TokenKind::Refresh => self.refresh.verification(),
        }
    }
}
