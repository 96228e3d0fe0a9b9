//! Sync endpoint routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    handle_delete, handle_migrate, handle_pull_all, handle_push_all, handle_push_one,
    handle_status, parse_collection, parse_record_key, CollectionResponse, MigrateResponse, RecordResponse,
    StatusResponse,
};
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync/{collection}/push", post(push_all_handler))
        .route("/sync/{collection}/pull", post(pull_all_handler))
        .route("/sync/{collection}/migrate", post(migrate_handler))
        .route(
            "/sync/{collection}/records/{key}",
            post(push_one_handler).delete(delete_handler),
        )
        .route("/sync/{collection}/status", get(status_handler))
}

/// POST /sync/{collection}/push - Push every local record.
async fn push_all_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
) -> Result<Json<CollectionResponse>> {
    let kind = parse_collection(&collection)?;
    Ok(Json(handle_push_all(&state.engine, kind).await?))
}

/// POST /sync/{collection}/pull - Pull every remote document.
async fn pull_all_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
) -> Result<Json<CollectionResponse>> {
    let kind = parse_collection(&collection)?;
    Ok(Json(handle_pull_all(&state.engine, kind).await?))
}

/// POST /sync/{collection}/migrate - Initial push, once per device.
async fn migrate_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
) -> Result<Json<MigrateResponse>> {
    let kind = parse_collection(&collection)?;
    Ok(Json(handle_migrate(&state.engine, kind).await?))
}

/// POST /sync/{collection}/records/{key} - Push one record.
async fn push_one_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, key)): Path<(String, String)>,
) -> Result<Json<RecordResponse>> {
    let kind = parse_collection(&collection)?;
    let row = parse_record_key(&key)?;
    Ok(Json(handle_push_one(&state.engine, kind, row).await?))
}

/// DELETE /sync/{collection}/records/{key} - Delete a record everywhere.
async fn delete_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, key)): Path<(String, String)>,
) -> Result<Json<RecordResponse>> {
    let kind = parse_collection(&collection)?;
    let row = parse_record_key(&key)?;
    Ok(Json(handle_delete(&state.engine, kind, row).await?))
}

/// GET /sync/{collection}/status - Latest phase of each task.
async fn status_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
) -> Result<Json<StatusResponse>> {
    let kind = parse_collection(&collection)?;
    Ok(Json(handle_status(&state.engine, kind)))
}
