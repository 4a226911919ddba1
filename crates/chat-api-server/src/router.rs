use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Public routes (no identity required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    // Member routes, each handler resolves the caller through AuthMember
    let member_routes = Router::new()
        .route("/api/chat", post(handlers::chat::chat_handler))
        .route("/api/chat/{product_id}", delete(handlers::chat::end_chat_handler))
        .route(
            "/api/chat/{product_id}/session",
            delete(handlers::chat::clear_session_handler),
        )
        .route("/api/history", get(handlers::history::list_history_handler))
        .route(
            "/api/history/recent",
            get(handlers::history::recent_products_handler),
        )
        .route(
            "/api/products/{product_id}/index",
            post(handlers::index::index_document_handler),
        );

    Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .with_state(state)
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
}
