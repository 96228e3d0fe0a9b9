//! Sync event stream route.

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};

use crate::auth::AuthUser;
use crate::handlers::handle_events_connection;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(events_handler))
}

/// GET /events - Upgrade to a WebSocket streaming `SyncEvent`s.
async fn events_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    ws: WebSocketUpgrade,
) -> Response {
    // Subscribe before upgrading so no transition is lost in between.
    let events = state.engine.subscribe();
    ws.on_upgrade(move |socket| handle_events_connection(socket, events))
}
