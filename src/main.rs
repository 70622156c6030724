use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liargame::config::ServerConfig;
use liargame::content::{ContentPool, StaticContentPool};
use liargame::registry::{spawn_room_sweeper, RoomRegistry};
use liargame::{api, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liargame=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting liar game server...");

    let config = ServerConfig::from_env();

    let content: Arc<dyn ContentPool> = match &config.content_path {
        Some(path) => match StaticContentPool::from_json_file(path) {
            Ok(pool) => {
                tracing::info!("Loaded subjects from {}", path.display());
                Arc::new(pool)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load subjects from {}: {}. Using built-in subjects.",
                    path.display(),
                    e
                );
                Arc::new(StaticContentPool::builtin())
            }
        },
        None => Arc::new(StaticContentPool::builtin()),
    };

    let registry = RoomRegistry::in_memory(config.rules.clone(), content);

    // Reclaim rooms that were abandoned mid-game or left open after the end
    spawn_room_sweeper(registry.clone(), config.cleanup.clone());

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(registry);

    tracing::info!("Listening on http://{}", config.addr);

    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.addr, e);
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
