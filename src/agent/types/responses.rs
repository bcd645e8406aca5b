//! Wire types of the enterprise platform's Responses API.

use serde::{Deserialize, Serialize};

use super::StreamUsage;

/// Reference to a hosted agent by name.
#[derive(Debug, Clone, Serialize)]
pub struct AgentReference {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
}

impl AgentReference {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            kind: "agent_reference",
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest {
    pub agent: AgentReference,
    pub input: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsesApiResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: Vec<ResponseOutputItem>,
    #[serde(default)]
    pub error: Option<ResponseErrorBody>,
    #[serde(default)]
    pub usage: Option<ResponseUsage>,
}

impl ResponsesApiResponse {
    /// Text of the first `output_text` segment of the first `message` item carrying one.
    ///
    /// An answer without any text segment is an empty string, not an error.
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.kind == "message")
            .flat_map(|item| item.content.iter().flatten())
            .find_map(|part| {
                if part.kind == "output_text" {
                    part.text.clone().filter(|t| !t.is_empty())
                } else {
                    None
                }
            })
            .unwrap_or_default()
    }

    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseOutputItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub content: Option<Vec<ResponseContentPart>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ResponseUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl From<ResponseUsage> for StreamUsage {
    fn from(usage: ResponseUsage) -> Self {
        StreamUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }
}

/// One `data:` envelope of the Responses event stream.
///
/// ```text
/// data: {"type":"response.created","response":{"id":"resp_1","status":"in_progress"}}
/// data: {"type":"response.output_text.delta","delta":"Hel"}
/// data: {"type":"response.completed","response":{"id":"resp_1","status":"completed","usage":{...}}}
/// data: [DONE]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseStreamEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub delta: Option<String>,
    #[serde(default)]
    pub response: Option<ResponsesApiResponse>,
    #[serde(default)]
    pub response_id: Option<String>,
    /// Set on top-level `error` envelopes.
    #[serde(default)]
    pub message: Option<String>,
}
