use crate::cli::{
    actions::{Action, server::Args},
    commands::{
        ARG_DSN, ARG_PORT,
        auth::{
            ARG_ACCESS_SECRET, ARG_ACCESS_TTL_SECONDS, ARG_HASH_ITERATIONS, ARG_HASH_MEMORY_KIB,
            ARG_HASH_PARALLELISM, ARG_LOOKUP_TIMEOUT_SECONDS, ARG_REFRESH_SECRET,
            ARG_REFRESH_TTL_SECONDS,
        },
    },
};
use crate::auth::{HashCost, TokenTtl};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Only PostgreSQL DSNs are accepted.
///
/// # Errors
/// Returns an error if the DSN is not a URL or uses another scheme.
pub fn validate_dsn(dsn: &str) -> Result<Url> {
    let url = Url::parse(dsn).context("invalid --dsn")?;
    match url.scheme() {
        "postgres" | "postgresql" => Ok(url),
        scheme => Err(anyhow!(
            "unsupported --dsn scheme '{scheme}', expected postgres:// or postgresql://"
        )),
    }
}

fn secret(matches: &clap::ArgMatches, id: &str) -> Result<SecretString> {
    matches
        .get_one::<String>(id)
        .cloned()
        .map(SecretString::from)
        .with_context(|| format!("missing required argument: --{id}"))
}

fn number<T: Clone + Send + Sync + 'static>(matches: &clap::ArgMatches, id: &str) -> Result<T> {
    matches
        .get_one::<T>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .map(|dsn| validate_dsn(dsn))
        .transpose()?;

    let ttl = TokenTtl::new(
        number(matches, ARG_ACCESS_TTL_SECONDS)?,
        number(matches, ARG_REFRESH_TTL_SECONDS)?,
    )?;

    let hash_cost = HashCost {
        memory_kib: number(matches, ARG_HASH_MEMORY_KIB)?,
        iterations: number(matches, ARG_HASH_ITERATIONS)?,
        parallelism: number(matches, ARG_HASH_PARALLELISM)?,
    };

    let lookup_timeout = Duration::from_secs(number(matches, ARG_LOOKUP_TIMEOUT_SECONDS)?);

    Ok(Action::Server(Args {
        port,
        dsn,
        access_secret: secret(matches, ARG_ACCESS_SECRET)?,
        refresh_secret: secret(matches, ARG_REFRESH_SECRET)?,
        ttl,
        hash_cost,
        lookup_timeout,
    }))
}
