use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use chat_api_server::auth::JwtManager;
use chat_api_server::config::{SessionBackend, Settings};
use chat_api_server::database::{DbPool, Repository};
use chat_api_server::router::build_router;
use chat_api_server::services::conversation::{
    InMemorySessionStore, RedisSessionStore, SessionCache, SessionStore,
};
use chat_api_server::services::{ConversationManager, InferenceService};
use chat_api_server::state::AppState;
use chat_api_server::utils::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    let _log_guard = init_logger(&settings.logging)?;
    info!("🚀 Starting Chat API Server...");
    info!("✅ Configuration loaded");

    // Initialize database pool
    let db_pool = DbPool::new(&settings.database).await?;
    if settings.database.run_migrations {
        db_pool.migrate().await?;
    }
    info!("✅ Database connection established");

    let repository = Arc::new(Repository::new(db_pool.clone()));

    // Session store
    let store: Arc<dyn SessionStore> = match settings.session.backend {
        SessionBackend::Redis => {
            Arc::new(RedisSessionStore::connect(&settings.session.redis_url).await?)
        }
        SessionBackend::Memory => {
            warn!("Using in-memory session store, sessions are not shared between instances");
            let store = InMemorySessionStore::new();
            spawn_session_sweeper(store.clone(), settings.session.ttl());
            Arc::new(store)
        }
    };
    let cache = SessionCache::new(store, settings.session.ttl(), settings.session.key_prefix.clone());
    info!(
        "✅ Session cache ready ({:?}, ttl={}m)",
        settings.session.backend, settings.session.ttl_minutes
    );

    // Initialize services
    let inference = Arc::new(InferenceService::new(&settings.inference)?);
    let conversation_manager = Arc::new(ConversationManager::new(
        cache,
        inference,
        repository.clone(),
        repository,
    ));

    let state = AppState {
        conversation_manager,
        jwt_manager: Arc::new(JwtManager::new(&settings.auth.jwt_secret)),
        health: Arc::new(db_pool.clone()),
    };

    // Build router
    let app = build_router(state);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_pool.close().await;
    info!("Server stopped");

    Ok(())
}

/// Periodically drop expired sessions so the in-memory store stays bounded
fn spawn_session_sweeper(store: InMemorySessionStore, ttl: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ttl.max(Duration::from_secs(60)));
        loop {
            interval.tick().await;
            store.cleanup_expired();
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
