use axum::extract::{Query, State};
use axum::Json;
use std::sync::Arc;
use tracing::debug;

use crate::auth::AuthMember;
use crate::database::ArchivedTurn;
use crate::models::chat::{HistoryQuery, ProductId};
use crate::services::ConversationManager;
use crate::utils::error::ApiError;

/// GET /api/history?productId=: archived turns of one product conversation
pub async fn list_history_handler(
    State(manager): State<Arc<ConversationManager>>,
    member: AuthMember,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ArchivedTurn>>, ApiError> {
    let turns = manager
        .get_histories(member.member_id, query.product_id)
        .await?;

    Ok(Json(turns))
}

/// GET /api/history/recent: products with archived conversations
pub async fn recent_products_handler(
    State(manager): State<Arc<ConversationManager>>,
    member: AuthMember,
) -> Result<Json<Vec<ProductId>>, ApiError> {
    let products = manager.recent_products(member.member_id).await?;
    debug!("Recent products for member {}: {:?}", member.member_id, products);

    Ok(Json(products))
}
