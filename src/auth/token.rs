//! HS256 token codec.
//!
//! Tokens are compact JWS strings: `base64url(header).base64url(claims).base64url(mac)`,
//! unpadded. Claims are integrity-protected only; nothing secret belongs in them.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use super::scope::ScopeSet;

type HmacSha256 = Hmac<Sha256>;

const ALG_HS256: &str = "HS256";
const TYP_JWT: &str = "JWT";

/// Discriminates access tokens from refresh tokens (`type` claim).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALG_HS256.to_string(),
            typ: TYP_JWT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Username of the identity the token was issued to. Empty when absent.
    #[serde(default)]
    pub sub: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    /// Granted scopes; only present on access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeSet>,
}

impl Claims {
    #[must_use]
    pub fn access(sub: impl Into<String>, scope: ScopeSet, iat: i64, exp: i64) -> Self {
        Self {
            sub: sub.into(),
            kind: TokenKind::Access,
            iat,
            exp,
            scope: Some(scope),
        }
    }

    #[must_use]
    pub fn refresh(sub: impl Into<String>, iat: i64, exp: i64) -> Self {
        Self {
            sub: sub.into(),
            kind: TokenKind::Refresh,
            iat,
            exp,
            scope: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature is valid but `exp` has elapsed.
    #[error("token expired")]
    Expired,
    /// Forged, corrupt or structurally malformed token.
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("failed to encode token claims")]
    Encode(#[source] serde_json::Error),
    /// `iat + ttl` does not fit in an `i64`.
    #[error("token expiry out of range")]
    ExpiryOverflow,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(TokenError::Encode)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::InvalidSignature)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::InvalidSignature)
}

fn mac(key: &[u8], signing_input: &str) -> Result<HmacSha256, TokenError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| TokenError::InvalidSignature)?;
    mac.update(signing_input.as_bytes());
    Ok(mac)
}

/// Sign `claims` with `signing_key` and return the compact token.
///
/// # Errors
///
/// Returns [`TokenError::Encode`] if the claims cannot be serialized.
pub fn encode(claims: &Claims, signing_key: &[u8]) -> Result<String, TokenError> {
    let header_b64 = b64e_json(&TokenHeader::hs256())?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let signature = mac(signing_key, &signing_input)?.finalize().into_bytes();
    let signature_b64 = Base64UrlUnpadded::encode_string(&signature);

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Verify `token` against `verification_key` and return its claims.
///
/// The MAC is checked (in constant time) before the claims are parsed, and expiry
/// is checked only once the signature is known to be good.
///
/// # Errors
///
/// - [`TokenError::InvalidSignature`] if the token is malformed, uses another
///   algorithm, or its MAC does not verify;
/// - [`TokenError::Expired`] if `now_unix_seconds >= exp`.
pub fn decode(
    token: &str,
    verification_key: &[u8],
    now_unix_seconds: i64,
) -> Result<Claims, TokenError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(TokenError::InvalidSignature)?;
    let claims_b64 = parts.next().ok_or(TokenError::InvalidSignature)?;
    let sig_b64 = parts.next().ok_or(TokenError::InvalidSignature)?;
    if parts.next().is_some() {
        return Err(TokenError::InvalidSignature);
    }

    let header: TokenHeader = b64d_json(header_b64)?;
    if header.alg != ALG_HS256 {
        return Err(TokenError::InvalidSignature);
    }

    let signature =
        Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::InvalidSignature)?;
    let signing_input = format!("{header_b64}.{claims_b64}");
    mac(verification_key, &signing_input)?
        .verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let claims: Claims = b64d_json(claims_b64)?;
    if now_unix_seconds >= claims.exp {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}
