//! HTTP handlers and the shared error/credential plumbing they use.
//!
//! Every handler reaches the core through `Extension<Arc<AuthService>>` and returns
//! `Result<_, AuthError>`; the mapping to status codes lives here so it is the same
//! for every route.

pub mod auth;
pub mod health;
pub mod protected;

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::auth::AuthError;

/// Body of every error response.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[must_use]
pub const fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden => StatusCode::FORBIDDEN,
        AuthError::Conflict => StatusCode::CONFLICT,
        AuthError::NotFound => StatusCode::NOT_FOUND,
        AuthError::Invalid(_) => StatusCode::BAD_REQUEST,
        AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        match &self {
            Self::Unavailable(source) => warn!("identity store unavailable: {source:#}"),
            Self::Internal(source) => error!("internal error: {source:#}"),
            _ => {}
        }

        let body = Json(ErrorBody {
            detail: self.to_string(),
        });

        if status == StatusCode::UNAUTHORIZED {
            let mut headers = HeaderMap::new();
            headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            (status, headers, body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
///
/// Any other scheme, or a missing/non-ASCII header, yields `None`.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Unauthenticated;
    use anyhow::{Result, anyhow};
    use axum::body::to_bytes;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    #[test]
    fn bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer  abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("abc.def.ghi")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (
                AuthError::from(Unauthenticated::Expired),
                StatusCode::UNAUTHORIZED,
            ),
            (AuthError::Forbidden, StatusCode::FORBIDDEN),
            (AuthError::Conflict, StatusCode::CONFLICT),
            (AuthError::NotFound, StatusCode::NOT_FOUND),
            (AuthError::Invalid("bad".to_string()), StatusCode::BAD_REQUEST),
            (
                AuthError::Unavailable(anyhow!("down")),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AuthError::Internal(anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{err}");
        }
    }

    #[tokio::test]
    async fn unauthenticated_response_has_detail_and_challenge() -> Result<()> {
        let response = AuthError::from(Unauthenticated::Expired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE),
            Some(&HeaderValue::from_static("Bearer"))
        );
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let body: ErrorBody = serde_json::from_slice(&body)?;
        assert_eq!(body.detail, "token expired");
        Ok(())
    }

    #[tokio::test]
    async fn internal_error_hides_source() -> Result<()> {
        let response = AuthError::Internal(anyhow!("secret stack detail")).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let body: ErrorBody = serde_json::from_slice(&body)?;
        assert_eq!(body.detail, "internal error");
        Ok(())
    }
}
