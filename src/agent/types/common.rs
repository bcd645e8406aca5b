use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::transcoder::sse::Event;

// ===================================
// Conversation Structures
// ===================================

/// The author of one entry in a conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of a conversation history, as exchanged with the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Question,
    Request,
    Exploration,
}

/// A follow-up prompt the UI may offer as a chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
}

/// The input of one turn, whichever calling convention is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatTurnRequest {
    pub message: String,
    /// Handle issued by the backend on a previous turn. `None` starts a new conversation.
    pub conversation_handle: Option<String>,
    /// Tracing correlation id. Generated when absent, never interpreted.
    pub correlation_id: Option<String>,
    /// Only sent to backends without server-side memory.
    pub prior_history: Vec<HistoryEntry>,
}

impl ChatTurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.conversation_handle = Some(handle.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.prior_history = history;
        self
    }

    /// The handle to continue, ignoring blank strings sent by sloppy clients.
    pub fn handle(&self) -> Option<&str> {
        self.conversation_handle
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }

    /// Returns the caller's correlation id. Without one, a continued
    /// conversation is correlated by its handle and only a new one mints an id.
    pub fn correlation_id_or_new(&self) -> String {
        self.correlation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .or_else(|| self.handle())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

/// The outcome of a non-streaming turn.
///
/// Serialised with the field names the chat client already understands, so the
/// conversation handle travels as `threadId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnResult {
    pub message: String,
    #[serde(rename = "threadId")]
    pub conversation_handle: String,
    pub agent_type: String,
    pub suggestions: Vec<Suggestion>,
    pub conversation_history: Vec<HistoryEntry>,
}

impl ChatTurnResult {
    /// Builds the result of a finished turn; the history holds the user/assistant pair.
    pub fn completed(
        question: &str,
        answer: String,
        conversation_handle: String,
        agent_type: &str,
    ) -> Self {
        Self {
            conversation_history: vec![
                HistoryEntry::user(question),
                HistoryEntry::assistant(answer.clone()),
            ],
            message: answer,
            conversation_handle,
            agent_type: agent_type.to_string(),
            suggestions: Vec::new(),
        }
    }
}

// ===================================
// Health
// ===================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResult {
    pub is_online: bool,
    /// Milliseconds spent probing the backend. Absent when nothing was probed.
    #[serde(rename = "responseTime", skip_serializing_if = "Option::is_none", default)]
    pub response_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl HealthResult {
    pub fn online(response_time_ms: f64) -> Self {
        Self {
            is_online: true,
            response_time_ms: Some(response_time_ms),
            error: None,
        }
    }

    pub fn offline(response_time_ms: f64, error: impl Into<String>) -> Self {
        Self {
            is_online: false,
            response_time_ms: Some(response_time_ms),
            error: Some(error.into()),
        }
    }

    pub fn not_configured(error: impl Into<String>) -> Self {
        Self {
            is_online: false,
            response_time_ms: None,
            error: Some(error.into()),
        }
    }
}

// ===================================
// Canonical Stream Events
// ===================================

/// Token counters reported by a backend at the end of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The backend-agnostic event vocabulary sent to chat clients.
///
/// A well-formed sequence is `Start Delta* Done`:
///
/// ```text
/// data: {"type":"start","responseId":"r1"}
/// data: {"type":"delta","content":"Hel"}
/// data: {"type":"delta","content":"lo"}
/// data: {"type":"done","responseId":"r1","usage":{"input_tokens":3,"output_tokens":2}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CanonicalStreamEvent {
    Start {
        #[serde(rename = "responseId")]
        conversation_handle: String,
    },
    Delta {
        #[serde(rename = "content")]
        text: String,
    },
    Done {
        #[serde(rename = "responseId")]
        conversation_handle: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        usage: Option<StreamUsage>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        duration_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error: Option<String>,
    },
}

impl CanonicalStreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CanonicalStreamEvent::Done { .. })
    }

    /// Encodes the event as one `data: <json>\n\n` SSE frame.
    pub fn to_sse(&self) -> String {
        Event::default()
            .data(serde_json::to_string(self).unwrap_or_default())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_event_wire_shape() {
        let event = CanonicalStreamEvent::Start {
            conversation_handle: "r1".to_string(),
        };
        assert_eq!(
            event.to_sse(),
            "data: {\"type\":\"start\",\"responseId\":\"r1\"}\n\n"
        );
    }

    #[test]
    fn test_done_event_omits_absent_fields() {
        let event = CanonicalStreamEvent::Done {
            conversation_handle: "r1".to_string(),
            usage: None,
            duration_ms: None,
            error: None,
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"type":"done","responseId":"r1"}"#
        );
    }

    #[test]
    fn test_done_event_carries_usage_and_error() {
        let event = CanonicalStreamEvent::Done {
            conversation_handle: "s1".to_string(),
            usage: Some(StreamUsage {
                input_tokens: 4,
                output_tokens: 9,
            }),
            duration_ms: Some(120),
            error: Some("boom".to_string()),
        };
        let value: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["usage"]["input_tokens"], 4);
        assert_eq!(value["usage"]["output_tokens"], 9);
        assert_eq!(value["duration_ms"], 120);
        assert_eq!(value["error"], "boom");
    }

    #[test]
    fn test_turn_result_uses_client_field_names() {
        let result = ChatTurnResult::completed("ping", "pong".to_string(), "r1".into(), "galnet");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["threadId"], "r1");
        assert_eq!(value["agentType"], "galnet");
        assert_eq!(value["conversationHistory"][0]["role"], "user");
        assert_eq!(value["conversationHistory"][1]["content"], "pong");
        assert!(value["suggestions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_health_not_configured_has_no_response_time() {
        let value = serde_json::to_value(HealthResult::not_configured("missing")).unwrap();
        assert_eq!(value["isOnline"], false);
        assert!(value.get("responseTime").is_none());
        assert_eq!(value["error"], "missing");
    }

    #[test]
    fn test_correlation_id_is_generated_when_blank() {
        let request = ChatTurnRequest::new("hi").with_correlation_id("  ");
        let id = request.correlation_id_or_new();
        assert!(Uuid::parse_str(&id).is_ok());

        let request = ChatTurnRequest::new("hi").with_correlation_id("conv-1");
        assert_eq!(request.correlation_id_or_new(), "conv-1");
    }

    #[test]
    fn test_correlation_id_follows_the_conversation() {
        let request = ChatTurnRequest::new("again").with_handle("session_1");
        assert_eq!(request.correlation_id_or_new(), "session_1");
        assert_eq!(request.correlation_id_or_new(), request.correlation_id_or_new());

        let request = ChatTurnRequest::new("again")
            .with_handle("session_1")
            .with_correlation_id("conv-1");
        assert_eq!(request.correlation_id_or_new(), "conv-1");
    }

    #[test]
    fn test_blank_handle_is_ignored() {
        assert_eq!(ChatTurnRequest::new("hi").with_handle(" ").handle(), None);
        assert_eq!(
            ChatTurnRequest::new("hi").with_handle("r1").handle(),
            Some("r1")
        );
    }
}
