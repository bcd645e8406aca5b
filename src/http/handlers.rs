use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::errors::{ApiError, ApiResult};
use super::types::TurnRequestBody;
use crate::agent::types::{ChatTurnResult, HealthResult};
use crate::agent::ProviderAdapter;

/// Shared by every route: the adapter chosen at start-up.
#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<dyn ProviderAdapter>,
}

/// `POST /api/agent`: one complete turn, continuing when a thread id is given.
pub async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<ChatTurnResult>> {
    let request = TurnRequestBody::parse(&body)?.into_turn_request()?;

    let result = match request.handle() {
        Some(handle) => {
            log::info!(
                "continuing {} chat, thread: {}",
                state.adapter.name(),
                handle
            );
            state.adapter.continue_chat(&request).await?
        }
        None => {
            log::info!("starting {} chat", state.adapter.name());
            state.adapter.start_chat(&request).await?
        }
    };

    #[cfg(debug_assertions)]
    log::debug!(
        "chat answered, thread: {}, message: {}",
        result.conversation_handle,
        result.message.chars().take(100).collect::<String>()
    );
    Ok(Json(result))
}

/// `POST /api/agent/stream`: one turn as a canonical event stream.
pub async fn stream_handler(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request = TurnRequestBody::parse(&body)?.into_turn_request()?;
    log::info!(
        "starting {} stream, thread: {}",
        state.adapter.name(),
        request.handle().unwrap_or("-")
    );

    let stream = state.adapter.start_chat_stream(&request).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// `GET /api/agent/health`: the verdict is in the body, the status is 200 either way.
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let adapter = state.adapter.clone();
    // A panicking probe must not take the connection down with it
    match tokio::spawn(async move { adapter.check_health().await }).await {
        Ok(health) => (StatusCode::OK, Json(health)).into_response(),
        Err(e) => {
            log::error!("health check task failed: {}", e);
            let health = HealthResult {
                is_online: false,
                response_time_ms: None,
                error: Some("Health check failed".to_string()),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(health)).into_response()
        }
    }
}
