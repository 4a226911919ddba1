use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::info;

use crate::auth::AuthMember;
use crate::models::chat::{ChatRequest, Conversation, MessageResponse, ProductId};
use crate::services::ConversationManager;
use crate::utils::error::ApiError;

/// POST /api/chat: ask one question about a product
pub async fn chat_handler(
    State(manager): State<Arc<ConversationManager>>,
    member: AuthMember,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Conversation>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::BadRequest("Question must not be empty".to_string()));
    }

    info!(
        "Chat request: member={}, product={}, question_len={}",
        member.member_id,
        request.product_id,
        request.question.len()
    );

    let conversation = manager
        .process_chat(member.member_id, request.product_id, request.question)
        .await?;

    Ok(Json(conversation))
}

/// DELETE /api/chat/{product_id}: archive the conversation
pub async fn end_chat_handler(
    State(manager): State<Arc<ConversationManager>>,
    member: AuthMember,
    Path(product_id): Path<ProductId>,
) -> Result<Json<MessageResponse>, ApiError> {
    let archived = manager.end_chat(member.member_id, product_id).await?;

    Ok(Json(MessageResponse::new(format!(
        "Conversation ended, {} turns archived",
        archived
    ))))
}

/// DELETE /api/chat/{product_id}/session: drop the live conversation
pub async fn clear_session_handler(
    State(manager): State<Arc<ConversationManager>>,
    member: AuthMember,
    Path(product_id): Path<ProductId>,
) -> Result<Json<MessageResponse>, ApiError> {
    manager.clear_session(member.member_id, product_id).await?;

    Ok(Json(MessageResponse::new("Session cleared")))
}
