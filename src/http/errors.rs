use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::agent::AgentError;

/// Shown to the end user whenever a turn fails.
pub const FALLBACK_MESSAGE: &str = "Sorry, something went wrong. Please try again.";

/// Errors of the route boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Message is required")]
    MissingMessage,
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::MissingMessage => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Message is required" }),
            ),
            ApiError::InvalidBody(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid request body" }),
            ),
            // Vendor bodies stay in the log
            ApiError::Agent(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.user_message(), "message": FALLBACK_MESSAGE }),
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error", "message": FALLBACK_MESSAGE }),
            ),
        };

        if status.is_server_error() {
            log::error!("ApiError: status={}, error={}", status.as_u16(), self);
        } else {
            log::warn!("ApiError: status={}, error={}", status.as_u16(), self);
        }
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
