//! Wire types of the hosted RAG service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::HistoryEntry;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RagChatRequest<'a> {
    pub query: &'a str,
    pub session_id: &'a str,
    pub history: &'a [HistoryEntry],
}

/// The named events of the RAG stream.
///
/// ```text
/// event: chunk
/// data: "Hello"
///
/// event: done
/// data: {}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RagEventKind {
    Chunk,
    Sources,
    ToolCall,
    ToolResult,
    Done,
    Error,
    Other(String),
}

impl From<&str> for RagEventKind {
    fn from(label: &str) -> Self {
        match label {
            "chunk" => RagEventKind::Chunk,
            "sources" => RagEventKind::Sources,
            "tool_call" => RagEventKind::ToolCall,
            "tool_result" => RagEventKind::ToolResult,
            "done" => RagEventKind::Done,
            "error" => RagEventKind::Error,
            other => RagEventKind::Other(other.to_string()),
        }
    }
}

/// Payload of `tool_call` / `tool_result` events; only the name is of interest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RagToolEvent {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RagErrorEvent {
    #[serde(default)]
    pub message: Option<String>,
}

/// Extracts answer text from a `chunk` payload.
///
/// The service sends either a JSON string or an object with a `content` field.
/// A payload that is not JSON at all is treated as raw text.
pub fn chunk_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(text)) => Some(text),
        Ok(Value::Object(map)) => match map.get("content") {
            Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
            _ => None,
        },
        Ok(_) => None,
        Err(_) => Some(raw.to_string()),
    }
}
