use thiserror::Error;

use super::store::StoreError;

/// Why a credential was not accepted.
///
/// The `Display` text is safe to show to callers; none of the variants carry the
/// presented token or password.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Unauthenticated {
    MissingToken,
    Expired,
    InvalidToken,
    WrongTokenType,
    InvalidPayload,
    /// Unknown user or wrong password; the two are deliberately the same value.
    BadCredentials,
}

impl Unauthenticated {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingToken => "not authenticated",
            Self::Expired => "token expired",
            Self::InvalidToken => "invalid token",
            Self::WrongTokenType => "wrong token type",
            Self::InvalidPayload => "invalid token payload",
            Self::BadCredentials => "invalid username or password",
        }
    }
}

impl std::fmt::Display for Unauthenticated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing, expired, malformed or wrong-type credential, or failed login.
    #[error("{0}")]
    Unauthenticated(Unauthenticated),
    /// Valid identity without the required scopes.
    #[error("missing required scopes")]
    Forbidden,
    #[error("username already registered")]
    Conflict,
    /// Token subject no longer resolves to an identity.
    #[error("user not found")]
    NotFound,
    #[error("{0}")]
    Invalid(String),
    /// Identity store timed out or failed.
    #[error("identity store unavailable")]
    Unavailable(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl From<Unauthenticated> for AuthError {
    fn from(reason: Unauthenticated) -> Self {
        Self::Unauthenticated(reason)
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::Conflict,
            other => Self::Unavailable(other.into()),
        }
    }
}
