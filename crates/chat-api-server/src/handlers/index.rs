use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::info;

use crate::auth::AuthMember;
use crate::models::chat::{IndexRequest, ProductId};
use crate::services::inference_service::IndexResponse;
use crate::services::ConversationManager;
use crate::utils::error::ApiError;

/// POST /api/products/{product_id}/index: have the inference service
/// index the product manual at `fileUrl`
pub async fn index_document_handler(
    State(manager): State<Arc<ConversationManager>>,
    member: AuthMember,
    Path(product_id): Path<ProductId>,
    Json(request): Json<IndexRequest>,
) -> Result<Json<IndexResponse>, ApiError> {
    if request.file_url.trim().is_empty() {
        return Err(ApiError::BadRequest("fileUrl must not be empty".to_string()));
    }

    info!(
        "Index request: member={}, product={}",
        member.member_id, product_id
    );

    let response = manager
        .index_product_document(product_id, &request.file_url)
        .await?;

    Ok(Json(response))
}
