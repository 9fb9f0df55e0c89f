//! Roles, scopes and the role → scope mapping.
//!
//! Both enums are closed. Their string forms only exist at the serde edge (token
//! claims, storage, request bodies); everywhere else they are matched exhaustively.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use utoipa::ToSchema;

/// Role assigned to an identity at registration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A single named permission carried by access tokens.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, ToSchema)]
pub enum Scope {
    #[serde(rename = "user:read")]
    ReadUser,
    #[serde(rename = "user:write")]
    WriteUser,
    #[serde(rename = "admin:read")]
    ReadAdmin,
    #[serde(rename = "admin:write")]
    WriteAdmin,
}

impl Scope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadUser => "user:read",
            Self::WriteUser => "user:write",
            Self::ReadAdmin => "admin:read",
            Self::WriteAdmin => "admin:write",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unordered, deduplicated set of scopes.
///
/// Serializes as a sorted JSON array, so encoding the same set always yields the
/// same bytes.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<Scope>);

impl ScopeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    /// True when every scope in `required` is also in `self`.
    #[must_use]
    pub fn covers(&self, required: &Self) -> bool {
        required.0.is_subset(&self.0)
    }

    /// Scopes in `required` that `self` does not grant.
    pub fn missing<'a>(&'a self, required: &'a Self) -> impl Iterator<Item = Scope> + 'a {
        required.0.difference(&self.0).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        self.0.iter().copied()
    }
}

/// Space-separated scope names, as in an OAuth `scope` parameter.
impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, scope) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{scope}")?;
        }
        Ok(())
    }
}

impl<const N: usize> From<[Scope; N]> for ScopeSet {
    fn from(scopes: [Scope; N]) -> Self {
        Self(scopes.into_iter().collect())
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Scopes granted to a role.
#[must_use]
pub fn scopes_for(role: Role) -> ScopeSet {
    match role {
        Role::Admin => ScopeSet::from([Scope::ReadAdmin, Scope::WriteAdmin]),
        Role::User => ScopeSet::from([Scope::ReadUser, Scope::WriteUser]),
    }
}
