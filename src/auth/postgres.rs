//! Postgres-backed identity store.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};

use super::scope::Role;
use super::store::{Identity, IdentityStore, NewIdentity, StoreError};

const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username VARCHAR(50) NOT NULL UNIQUE,
    hashed_password TEXT NOT NULL,
    user_role VARCHAR(50) NOT NULL
)";

#[derive(Clone, Debug)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the statement fails.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await
            .context("failed to create users table")?;
        Ok(())
    }
}

fn identity_from_row(row: &PgRow) -> Result<Identity, StoreError> {
    let role: String = row.try_get("user_role").map_err(backend)?;
    Ok(Identity {
        id: row.try_get("id").map_err(backend)?,
        username: row.try_get("username").map_err(backend)?,
        password_hash: row.try_get("hashed_password").map_err(backend)?,
        role: role
            .parse::<Role>()
            .map_err(|err| StoreError::Backend(anyhow!(err)))?,
    })
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.into())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "SELECT");
        let row = sqlx::query(
            "SELECT id, username, hashed_password, user_role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .instrument(span)
        .await
        .map_err(backend)?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn insert(&self, identity: NewIdentity) -> Result<Identity, StoreError> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "INSERT");
        let result = sqlx::query(
            "INSERT INTO users (username, hashed_password, user_role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&identity.username)
        .bind(&identity.password_hash)
        .bind(identity.role.as_str())
        .fetch_one(&self.pool)
        .instrument(span)
        .await;

        match result {
            Ok(row) => Ok(Identity {
                id: row.try_get("id").map_err(backend)?,
                username: identity.username,
                password_hash: identity.password_hash,
                role: identity.role,
            }),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Conflict),
            Err(err) => Err(backend(err)),
        }
    }
}
