//! # Tessera (token issuance and scope-based access control)
//!
//! `tessera` issues short-lived signed credentials for authenticated users and
//! decides whether a presented credential grants access to a protected operation.
//!
//! ## Tokens
//!
//! Every successful register, login or refresh returns a **token pair**:
//!
//! - an **access token** (HS256 JWT) carrying the subject, its granted scopes and a
//!   short expiry, presented on every protected request;
//! - a **refresh token** carrying only the subject and a long expiry, exchanged for
//!   a new pair.
//!
//! The two kinds are signed with distinct secrets and carry a `type` claim, so an
//! access token is never accepted where a refresh token is expected (and vice versa).
//! Tokens are not stored anywhere: validity comes from the signature and `exp` only.
//!
//! ## Authorization
//!
//! Scopes are derived from the user's role at issuance time. A protected operation
//! declares the scopes it requires and the guard grants access only when all of them
//! are present in the token. Refresh re-derives scopes from the current role.
//!
//! ## Enumeration resistance
//!
//! Login failures for unknown users and wrong passwords are indistinguishable: same
//! error, and unknown users still pay for one password verification.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
