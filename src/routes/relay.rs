//! Relay WebSocket route configuration.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::relay::relay_handler;
use crate::state::AppState;

/// Create the relay WebSocket router.
///
/// # Endpoint
///
/// `GET /ws`: WebSocket upgrade; each connection is bridged to its own
/// upstream Gemini Live session.
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws", get(relay_handler))
        .layer(TraceLayer::new_for_http())
}
