use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use std::sync::Arc;
use tracing::debug;

use super::jwt::JwtManager;
use crate::models::chat::MemberId;
use crate::utils::error::ApiError;

/// Caller identity resolved from the `Authorization: Bearer` header
#[derive(Debug, Clone)]
pub struct AuthMember {
    pub member_id: MemberId,
    pub role: String,
}

impl<S> FromRequestParts<S> for AuthMember
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Expected a Bearer token".to_string()))?;

        let jwt = Arc::<JwtManager>::from_ref(state);
        let claims = jwt
            .validate_token(token)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

        debug!(member_id = claims.member_id, "Authenticated member");

        Ok(AuthMember {
            member_id: claims.member_id,
            role: claims.role,
        })
    }
}
