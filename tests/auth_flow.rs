use anyhow::{Result, anyhow};
use secrecy::SecretString;
use std::sync::Arc;
use tessera::auth::{
    AuthConfig, AuthError, AuthService, HashCost, IdentityStore, ManualClock, MemoryIdentityStore,
    NewIdentity, Role, Scope, ScopeSet, TokenKeys, TokenTtl, Unauthenticated, scopes_for,
};

const START: i64 = 1_700_000_000;
const ACCESS_TTL: i64 = 60;
const REFRESH_TTL: i64 = 3_600;

struct Harness {
    service: AuthService,
    clock: Arc<ManualClock>,
    store: Arc<MemoryIdentityStore>,
}

fn harness() -> Result<Harness> {
    let keys = TokenKeys::from_secrets(
        &SecretString::from("access-secret".to_string()),
        &SecretString::from("refresh-secret".to_string()),
    )?;
    let config = AuthConfig::new()
        .with_ttl(TokenTtl::new(ACCESS_TTL, REFRESH_TTL)?)
        .with_hash_cost(HashCost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        });
    let clock = Arc::new(ManualClock::new(START));
    let store = Arc::new(MemoryIdentityStore::new());
    let service = AuthService::new(keys, &config, store.clone(), clock.clone())?;
    Ok(Harness {
        service,
        clock,
        store,
    })
}

fn unauthenticated(err: Option<AuthError>) -> Result<Unauthenticated> {
    match err {
        Some(AuthError::Unauthenticated(reason)) => Ok(reason),
        other => Err(anyhow!("expected Unauthenticated, got {other:?}")),
    }
}

#[tokio::test]
async fn register_then_access_protected_operations() -> Result<()> {
    let h = harness()?;
    let pair = h.service.register("alice", "pw123456", Role::User).await?;
    assert_eq!(pair.expires_in, ACCESS_TTL);

    let principal = h
        .service
        .authorize(Some(&pair.access_token), &ScopeSet::from([Scope::ReadUser]))
        .await?;
    assert_eq!(principal.identity.username, "alice");
    assert_eq!(principal.scopes, scopes_for(Role::User));

    let err = h
        .service
        .authorize(Some(&pair.access_token), &ScopeSet::from([Scope::ReadAdmin]))
        .await
        .err();
    assert!(matches!(err, Some(AuthError::Forbidden)));
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> Result<()> {
    let h = harness()?;
    h.service.register("alice", "pw123456", Role::User).await?;
    let err = h
        .service
        .register("alice", "another-password", Role::Admin)
        .await
        .err();
    assert!(matches!(err, Some(AuthError::Conflict)));
    assert_eq!(h.store.len().await, 1);
    Ok(())
}

#[tokio::test]
async fn login_failures_are_indistinguishable() -> Result<()> {
    let h = harness()?;
    h.service.register("alice", "pw123456", Role::User).await?;

    let wrong_password = unauthenticated(h.service.login("alice", "nope").await.err())?;
    let unknown_user = unauthenticated(h.service.login("bob", "pw123456").await.err())?;
    assert_eq!(wrong_password, Unauthenticated::BadCredentials);
    assert_eq!(wrong_password, unknown_user);

    let pair = h.service.login("alice", "pw123456").await?;
    h.service
        .authorize(Some(&pair.access_token), &ScopeSet::new())
        .await?;
    Ok(())
}

#[tokio::test]
async fn expired_access_token_is_refreshed() -> Result<()> {
    let h = harness()?;
    let pair = h.service.register("alice", "pw123456", Role::User).await?;

    h.clock.advance(ACCESS_TTL + 1);
    let reason = unauthenticated(
        h.service
            .authorize(Some(&pair.access_token), &ScopeSet::from([Scope::ReadUser]))
            .await
            .err(),
    )?;
    assert_eq!(reason, Unauthenticated::Expired);

    let renewed = h.service.refresh(&pair.refresh_token).await?;
    assert_ne!(renewed.access_token, pair.access_token);
    let principal = h
        .service
        .authorize(Some(&renewed.access_token), &ScopeSet::from([Scope::ReadUser]))
        .await?;
    assert_eq!(principal.identity.username, "alice");
    Ok(())
}

#[tokio::test]
async fn expired_refresh_token_is_rejected() -> Result<()> {
    let h = harness()?;
    let pair = h.service.register("alice", "pw123456", Role::User).await?;
    h.clock.advance(REFRESH_TTL);
    let reason = unauthenticated(h.service.refresh(&pair.refresh_token).await.err())?;
    assert_eq!(reason, Unauthenticated::Expired);
    Ok(())
}

#[tokio::test]
async fn refresh_rederives_scopes_from_current_role() -> Result<()> {
    let h = harness()?;
    let pair = h.service.register("alice", "pw123456", Role::User).await?;

    let stored = h
        .store
        .remove("alice")
        .await
        .ok_or_else(|| anyhow!("alice was not stored"))?;
    h.store
        .insert(NewIdentity {
            username: stored.username,
            password_hash: stored.password_hash,
            role: Role::Admin,
        })
        .await?;

    let renewed = h.service.refresh(&pair.refresh_token).await?;
    let principal = h
        .service
        .authorize(
            Some(&renewed.access_token),
            &ScopeSet::from([Scope::ReadAdmin, Scope::WriteAdmin]),
        )
        .await?;
    assert_eq!(principal.scopes, scopes_for(Role::Admin));
    Ok(())
}

#[tokio::test]
async fn deleted_user_cannot_refresh() -> Result<()> {
    let h = harness()?;
    let pair = h.service.register("alice", "pw123456", Role::User).await?;
    h.store.remove("alice").await;

    let err = h.service.refresh(&pair.refresh_token).await.err();
    assert!(matches!(err, Some(AuthError::NotFound)));
    let err = h
        .service
        .authorize(Some(&pair.access_token), &ScopeSet::new())
        .await
        .err();
    assert!(matches!(err, Some(AuthError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn tokens_are_not_interchangeable() -> Result<()> {
    let h = harness()?;
    let pair = h.service.register("alice", "pw123456", Role::User).await?;

    let reason = unauthenticated(
        h.service
            .authorize(Some(&pair.refresh_token), &ScopeSet::new())
            .await
            .err(),
    )?;
    assert_eq!(reason, Unauthenticated::InvalidToken);

    let reason = unauthenticated(h.service.refresh(&pair.access_token).await.err())?;
    assert_eq!(reason, Unauthenticated::InvalidToken);
    Ok(())
}

#[tokio::test]
async fn missing_token_is_unauthenticated() -> Result<()> {
    let h = harness()?;
    let reason = unauthenticated(h.service.authorize(None, &ScopeSet::new()).await.err())?;
    assert_eq!(reason, Unauthenticated::MissingToken);
    Ok(())
}
