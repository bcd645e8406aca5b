//! Routes of the bridge.
//!
//! - `POST /api/agent`: complete turn, JSON in and out.
//! - `POST /api/agent/stream`: the same turn as `text/event-stream`.
//! - `GET /api/agent/health`: backend reachability.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{chat_handler, health_handler, stream_handler, AppState};
use crate::agent::ProviderAdapter;

pub fn routes(adapter: Arc<dyn ProviderAdapter>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/agent", post(chat_handler))
        .route("/api/agent/stream", post(stream_handler))
        .route("/api/agent/health", get(health_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB limit
        .layer(cors)
        .with_state(AppState { adapter })
}
