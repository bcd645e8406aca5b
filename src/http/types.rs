use serde::Deserialize;
use serde_json::Value;

use super::errors::ApiError;
use crate::agent::types::{ChatTurnRequest, HistoryEntry};

/// Body of `POST /api/agent` and `POST /api/agent/stream`.
///
/// ```json
/// {"message": "Where is Sol?", "threadId": "resp_1", "conversationId": "c-42", "history": []}
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequestBody {
    /// Kept loose so a non-string message is a validation error, not a parse error.
    #[serde(default)]
    pub message: Value,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub history: Option<Vec<HistoryEntry>>,
}

impl TurnRequestBody {
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()))
    }

    pub fn into_turn_request(self) -> Result<ChatTurnRequest, ApiError> {
        let message = match self.message {
            Value::String(message) if !message.trim().is_empty() => message,
            _ => return Err(ApiError::MissingMessage),
        };
        Ok(ChatTurnRequest {
            message,
            conversation_handle: self.thread_id,
            correlation_id: self.conversation_id,
            prior_history: self.history.unwrap_or_default(),
        })
    }
}
