use std::sync::Arc;
use axum::extract::FromRef;

use crate::auth::JwtManager;
use crate::database::HealthCheck;
use crate::services::ConversationManager;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub conversation_manager: Arc<ConversationManager>,
    pub jwt_manager: Arc<JwtManager>,
    pub health: Arc<dyn HealthCheck>,
}

impl FromRef<AppState> for Arc<ConversationManager> {
    fn from_ref(state: &AppState) -> Self {
        state.conversation_manager.clone()
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_manager.clone()
    }
}
