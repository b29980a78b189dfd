//! parley-gateway server entry point.
//!
//! Starts the Axum HTTP server with the REST and WebSocket endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use parley_gateway::api;
use parley_gateway::app_state::AppState;
use parley_gateway::config::RelayConfig;
use parley_gateway::domain::{ConnectionRegistry, GroupMembership};
use parley_gateway::persistence::memory::MemoryStore;
use parley_gateway::persistence::postgres::PostgresStore;
use parley_gateway::persistence::{Directory, MessageStore};
use parley_gateway::service::ChatService;
use parley_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config =
        RelayConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    tracing::info!(addr = %config.listen_addr, "starting parley-gateway");

    // Build live state
    let registry = Arc::new(ConnectionRegistry::new());
    let membership = Arc::new(GroupMembership::new());

    // Build the store seams
    let (store, directory): (Arc<dyn MessageStore>, Arc<dyn Directory>) =
        if config.persistence_enabled {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .min_connections(config.database_min_connections)
                .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
                .connect(&config.database_url)
                .await
                .context("connecting to PostgreSQL")?;
            let postgres = Arc::new(PostgresStore::new(pool));
            postgres
                .ensure_schema()
                .await
                .context("initializing database schema")?;
            let store: Arc<dyn MessageStore> = Arc::clone(&postgres) as Arc<dyn MessageStore>;
            let directory: Arc<dyn Directory> = postgres;
            (store, directory)
        } else {
            tracing::warn!("persistence disabled; messages are lost on restart");
            let memory = Arc::new(MemoryStore::new());
            let store: Arc<dyn MessageStore> = Arc::clone(&memory) as Arc<dyn MessageStore>;
            let directory: Arc<dyn Directory> = memory;
            (store, directory)
        };

    // Build service layer
    let chat_service = Arc::new(ChatService::new(store, directory, registry, membership));

    // Build application state
    let app_state = AppState {
        chat_service,
        ws_max_message_bytes: config.ws_max_message_bytes,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .context("binding listen address")?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
