//! Migrator Server - host process for the directory sync engine.
//!
//! Wires the engine to the SQLite local store and the REST remote stores,
//! then exposes sync and maintenance operations over HTTP and streams sync
//! progress over a WebSocket.

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod remote;
mod routes;
mod websocket;

use crate::config::Config;
use crate::db::{Pool, SqliteLocalStore, SqliteStateStore};
use crate::remote::{RestBlobStore, RestClient, RestDocumentStore};
use axum::Router;
use migrator_engine::{ResetEngine, Stores, SyncEngine};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub engine: Arc<SyncEngine>,
    pub reset: Arc<ResetEngine>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "migrator_server=debug,migrator_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        environment = ?config.environment,
        remote = %config.remote_url,
        "Starting Migrator Server on {}:{}",
        config.host,
        config.port
    );

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Remote stores share one HTTP client
    let http = reqwest::Client::new();
    let documents = RestClient::new(http.clone(), &config.remote_url, config.remote_token.clone())?;
    let blobs = RestClient::new(http, &config.blob_url, config.remote_token.clone())?;

    let engine = Arc::new(SyncEngine::new(
        Stores {
            local: Arc::new(SqliteLocalStore::new(pool.clone())),
            remote: Arc::new(RestDocumentStore::new(documents)),
            blobs: Arc::new(RestBlobStore::new(blobs)),
            state: Arc::new(SqliteStateStore::new(pool.clone())),
        },
        &config.engine_config(),
    ));
    let reset = Arc::new(ResetEngine::new(engine.clone(), config.environment));

    // Build application state
    let state = AppState {
        pool,
        engine,
        reset,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
