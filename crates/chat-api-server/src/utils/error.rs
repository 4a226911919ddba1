use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::chat::{MemberId, ProductId};
use crate::services::inference_service::InferenceError;

/// Failures of a chat operation that reach the caller.
/// Cache faults never show up here, the session cache absorbs them.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Inference service returned an empty response")]
    EmptyUpstreamResponse,

    #[error("Inference service rejected the request: {0}")]
    UpstreamRequestRejected(String),

    #[error("Inference service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Unknown chat role: {0}")]
    RoleMapping(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<InferenceError> for ChatError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::EmptyResponse => ChatError::EmptyUpstreamResponse,
            InferenceError::RequestRejected(body) => ChatError::UpstreamRequestRejected(body),
            InferenceError::Unavailable(body) => ChatError::UpstreamUnavailable(body),
        }
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        ChatError::Database(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream rejected request: {0}")]
    UpstreamRejected(String),

    #[error("Upstream returned empty response")]
    EmptyUpstreamResponse,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::MemberNotFound(_) | ChatError::ProductNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            ChatError::EmptyUpstreamResponse => ApiError::EmptyUpstreamResponse,
            ChatError::UpstreamRequestRejected(body) => ApiError::UpstreamRejected(body),
            ChatError::UpstreamUnavailable(body) => ApiError::UpstreamUnavailable(body),
            ChatError::RoleMapping(_) => ApiError::InternalError(err.to_string()),
            ChatError::Database(msg) => ApiError::DatabaseError(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized: {}", msg);
                (StatusCode::UNAUTHORIZED, "Unauthorized", msg)
            }
            ApiError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, "NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", msg)
            }
            ApiError::UpstreamRejected(msg) => {
                tracing::warn!("Upstream rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, "UpstreamRequestRejected", msg)
            }
            ApiError::EmptyUpstreamResponse => {
                tracing::error!("Upstream returned empty response");
                (
                    StatusCode::BAD_GATEWAY,
                    "EmptyUpstreamResponse",
                    "Inference service returned an empty response".to_string(),
                )
            }
            ApiError::UpstreamUnavailable(msg) => {
                tracing::error!("Upstream unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "UpstreamUnavailable", msg)
            }
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError", msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_failures_keep_distinct_status_codes() {
        let cases = [
            (ChatError::EmptyUpstreamResponse, StatusCode::BAD_GATEWAY),
            (
                ChatError::UpstreamRequestRejected("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ChatError::UpstreamUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ChatError::ProductNotFound(42), StatusCode::NOT_FOUND),
            (ChatError::MemberNotFound(7), StatusCode::NOT_FOUND),
            (
                ChatError::RoleMapping("system".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_inference_errors_map_onto_chat_errors() {
        assert!(matches!(
            ChatError::from(InferenceError::EmptyResponse),
            ChatError::EmptyUpstreamResponse
        ));
        assert!(matches!(
            ChatError::from(InferenceError::RequestRejected("x".into())),
            ChatError::UpstreamRequestRejected(body) if body == "x"
        ));
        assert!(matches!(
            ChatError::from(InferenceError::Unavailable("y".into())),
            ChatError::UpstreamUnavailable(body) if body == "y"
        ));
    }
}
