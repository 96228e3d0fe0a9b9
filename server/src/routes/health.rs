//! Health check endpoint.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
}

/// Create health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

/// Health check handler. Fails when the local database is unreachable.
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    if state.pool.is_closed() {
        return Err(AppError::Internal("database pool is closed".to_string()));
    }
    sqlx::query("SELECT 1").execute(&state.pool).await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: format!("{:?}", state.config.environment).to_lowercase(),
    }))
}

/// Root handler.
async fn root() -> &'static str {
    "Migrator Sync Server"
}
