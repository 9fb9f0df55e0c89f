use crate::{
    api,
    auth::{
        AuthConfig, AuthService, HashCost, IdentityStore, MemoryIdentityStore, PgIdentityStore,
        SystemClock, TokenKeys, TokenTtl,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<Url>,
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub ttl: TokenTtl,
    pub hash_cost: HashCost,
    pub lookup_timeout: Duration,
}

/// Connect the identity store selected by `dsn`, creating the schema if needed.
///
/// # Errors
/// Returns an error if the database is unreachable or the schema cannot be created.
pub async fn identity_store(
    dsn: Option<&Url>,
    lookup_timeout: Duration,
) -> Result<Arc<dyn IdentityStore>> {
    let Some(dsn) = dsn else {
        warn!("No --dsn given, identities are kept in memory");
        return Ok(Arc::new(MemoryIdentityStore::new()));
    };

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .acquire_timeout(lookup_timeout)
        .test_before_acquire(true)
        .connect(dsn.as_str())
        .await
        .context("Failed to connect to database")?;

    let store = PgIdentityStore::new(pool);
    store.migrate().await?;

    info!(
        host = dsn.host_str().unwrap_or("unknown"),
        "Connected to identity database"
    );

    Ok(Arc::new(store))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the keys or hashing parameters are invalid, the database is
/// unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        port = args.port,
        access_ttl_seconds = args.ttl.access_seconds,
        refresh_ttl_seconds = args.ttl.refresh_seconds,
        "Starting tessera"
    );

    let keys = TokenKeys::from_secrets(&args.access_secret, &args.refresh_secret)
        .context("Invalid token secrets")?;

    let store = identity_store(args.dsn.as_ref(), args.lookup_timeout).await?;

    let config = AuthConfig::new()
        .with_ttl(args.ttl)
        .with_hash_cost(args.hash_cost)
        .with_lookup_timeout(args.lookup_timeout);

    let service = AuthService::new(keys, &config, store, Arc::new(SystemClock))
        .context("Invalid password hashing parameters")?;

    api::serve(args.port, Arc::new(service)).await
}
