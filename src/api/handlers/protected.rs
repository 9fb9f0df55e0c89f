//! Scope-gated endpoints.
//!
//! Each handler names the scopes it needs; [`AuthService::authorize`] does the rest.

use axum::{
    extract::Extension,
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use super::{ErrorBody, MessageResponse, bearer_token};
use crate::auth::{AuthError, AuthService, Principal, Role, Scope, ScopeSet};

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub scopes: ScopeSet,
}

impl From<Principal> for MeResponse {
    fn from(principal: Principal) -> Self {
        Self {
            id: principal.identity.id,
            username: principal.identity.username,
            role: principal.identity.role,
            scopes: principal.scopes,
        }
    }
}

async fn authorize(
    service: &AuthService,
    headers: &HeaderMap,
    required: &[Scope],
) -> Result<Principal, AuthError> {
    let required: ScopeSet = required.iter().copied().collect();
    service.authorize(bearer_token(headers), &required).await
}

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The authenticated user and the scopes its token grants", body = MeResponse),
        (status = 401, description = "Missing, expired or invalid access token", body = ErrorBody),
        (status = 404, description = "Token subject no longer exists", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "protected"
)]
#[instrument(skip_all)]
pub async fn me(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AuthError> {
    let principal = authorize(&service, &headers, &[]).await?;
    Ok(Json(principal.into()))
}

#[utoipa::path(
    get,
    path = "/read_user",
    responses(
        (status = 200, description = "Caller holds user:read", body = MessageResponse),
        (status = 401, description = "Missing, expired or invalid access token", body = ErrorBody),
        (status = 403, description = "Missing required scopes", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "protected"
)]
#[instrument(skip_all)]
pub async fn read_user(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AuthError> {
    let principal = authorize(&service, &headers, &[Scope::ReadUser]).await?;
    Ok(Json(MessageResponse::new(format!(
        "Welcome, {}. You have user access.",
        principal.identity.username
    ))))
}

#[utoipa::path(
    get,
    path = "/read_admin",
    responses(
        (status = 200, description = "Caller holds admin:read", body = MessageResponse),
        (status = 401, description = "Missing, expired or invalid access token", body = ErrorBody),
        (status = 403, description = "Missing required scopes", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "protected"
)]
#[instrument(skip_all)]
pub async fn read_admin(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AuthError> {
    // Read access only; admin:write is what separates /full_admin from this route.
    let principal = authorize(&service, &headers, &[Scope::ReadAdmin]).await?;
    Ok(Json(MessageResponse::new(format!(
        "Welcome, {}. You have semi-admin access.",
        principal.identity.username
    ))))
}

#[utoipa::path(
    get,
    path = "/full_admin",
    responses(
        (status = 200, description = "Caller holds admin:read and admin:write", body = MessageResponse),
        (status = 401, description = "Missing, expired or invalid access token", body = ErrorBody),
        (status = 403, description = "Missing required scopes", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "protected"
)]
#[instrument(skip_all)]
pub async fn full_admin(
    service: Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AuthError> {
    let principal = authorize(&service, &headers, &[Scope::ReadAdmin, Scope::WriteAdmin]).await?;
    Ok(Json(MessageResponse::new(format!(
        "Welcome, {}. You have full-admin access.",
        principal.identity.username
    ))))
}
