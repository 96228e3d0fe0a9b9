//! Maintenance routes.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use migrator_engine::ResetReport;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_dedupe, handle_reset, parse_collection, CollectionResponse};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/maintenance/{collection}/dedupe", post(dedupe_handler))
        .route("/maintenance/reset", post(reset_handler))
}

/// POST /maintenance/{collection}/dedupe - Remove remote duplicates by name.
async fn dedupe_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
) -> Result<Json<CollectionResponse>> {
    let kind = parse_collection(&collection)?;
    Ok(Json(handle_dedupe(&state.engine, kind).await?))
}

/// POST /maintenance/reset - Wipe and reseed. Refused in production.
async fn reset_handler(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<ResetReport>> {
    Ok(Json(handle_reset(&state.reset).await?))
}
