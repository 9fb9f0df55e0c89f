//! Credential hashing, token issuance and scope-based access control.
//!
//! [`AuthService`] is the entry point used by the HTTP layer; the pieces it is
//! assembled from are public so they can be used and tested on their own.

pub mod clock;
pub mod error;
pub mod guard;
pub mod issuer;
pub mod keys;
pub mod password;
pub mod postgres;
pub mod scope;
pub mod service;
pub mod store;
pub mod token;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::error::{AuthError, Unauthenticated};
pub use self::guard::{AccessGuard, Principal, require};
pub use self::issuer::{TokenIssuer, TokenPair, TokenTtl};
pub use self::keys::{KeyPair, TokenKeys};
pub use self::password::{HashCost, PasswordHasher};
pub use self::postgres::PgIdentityStore;
pub use self::scope::{Role, Scope, ScopeSet, scopes_for};
pub use self::service::{AuthConfig, AuthService};
pub use self::store::{Identity, IdentityStore, MemoryIdentityStore, NewIdentity, StoreError};
pub use self::token::{Claims, TokenError, TokenKind};
