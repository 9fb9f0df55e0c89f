//! Credential endpoints: register, login, refresh and logout.
//!
//! All three token-producing endpoints return the same [`TokenPair`] body. Request
//! bodies are taken as `Option<Json<_>>` so a missing or malformed payload is reported
//! as a 400 with the usual `{"detail"}` body instead of axum's plain-text rejection.

use axum::{
    extract::Extension,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use super::{ErrorBody, MessageResponse};
use crate::auth::{AuthError, AuthService, Role, TokenPair};

#[derive(ToSchema, Deserialize)]
pub struct RegisterRequest {
    username: String,
    password: String,
    /// Defaults to `user`.
    #[serde(default)]
    role: Role,
}

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(ToSchema, Deserialize)]
pub struct RefreshRequest {
    refresh_token: String,
}

fn payload<T>(payload: Option<Json<T>>) -> Result<T, AuthError> {
    payload
        .map(|Json(payload)| payload)
        .ok_or_else(|| AuthError::Invalid("missing or malformed payload".to_string()))
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created, token pair issued", body = TokenPair),
        (status = 400, description = "Invalid username, password or payload", body = ErrorBody),
        (status = 409, description = "Username already registered", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    service: Extension<Arc<AuthService>>,
    request: Option<Json<RegisterRequest>>,
) -> Result<Json<TokenPair>, AuthError> {
    let request = payload(request)?;
    let pair = service
        .register(&request.username, &request.password, request.role)
        .await?;
    Ok(Json(pair))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 401, description = "Invalid username or password", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    service: Extension<Arc<AuthService>>,
    request: Option<Json<LoginRequest>>,
) -> Result<Json<TokenPair>, AuthError> {
    let request = payload(request)?;
    let pair = service.login(&request.username, &request.password).await?;
    Ok(Json(pair))
}

#[utoipa::path(
    post,
    path = "/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair with scopes from the current role", body = TokenPair),
        (status = 401, description = "Expired, invalid or wrong-type token", body = ErrorBody),
        (status = 404, description = "Token subject no longer exists", body = ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn refresh(
    service: Extension<Arc<AuthService>>,
    request: Option<Json<RefreshRequest>>,
) -> Result<Json<TokenPair>, AuthError> {
    let request = payload(request)?;
    let pair = service.refresh(&request.refresh_token).await?;
    Ok(Json(pair))
}

#[utoipa::path(
    get,
    path = "/logout",
    responses(
        (status = 200, description = "Nothing to revoke; clients discard their tokens", body = MessageResponse),
    ),
    tag = "auth"
)]
pub async fn logout() -> impl IntoResponse {
    Json(MessageResponse::new("Logout successful"))
}
