use std::time::Instant;

use super::{sse, FrameState, StreamTranscoder};
use crate::agent::types::rag::{chunk_text, RagErrorEvent, RagEventKind, RagToolEvent};

/// Re-frames the RAG service's named-event stream.
///
/// The vendor sends `event: <label>` followed by `data: <payload>`; the label
/// applies to the next data line only. The vendor has no response id, so the
/// client-generated session id is announced before any upstream byte arrives.
#[derive(Debug)]
pub struct RagTranscoder {
    session_id: String,
    current_event: Option<RagEventKind>,
    started_at: Instant,
    frame: FrameState,
}

impl RagTranscoder {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            current_event: None,
            started_at: Instant::now(),
            frame: FrameState::new(),
        }
    }

    /// The label waiting for its data line, exposed for inspection.
    pub fn current_event(&self) -> Option<&RagEventKind> {
        self.current_event.as_ref()
    }

    fn on_data(&mut self, kind: RagEventKind, raw: &str) {
        match kind {
            RagEventKind::Chunk => {
                if let Some(text) = chunk_text(raw) {
                    self.frame.delta(text);
                }
            }
            RagEventKind::Sources => match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(sources) => log::info!(
                    "rag sources received: {}",
                    sources.as_array().map(Vec::len).unwrap_or(0)
                ),
                Err(_) => self.frame.malformed("rag", raw),
            },
            RagEventKind::ToolCall | RagEventKind::ToolResult => {
                match serde_json::from_str::<RagToolEvent>(raw) {
                    Ok(tool) => log::info!(
                        "rag {}: {}",
                        if kind == RagEventKind::ToolCall {
                            "tool call"
                        } else {
                            "tool result"
                        },
                        tool.name.as_deref().unwrap_or("<unnamed>")
                    ),
                    Err(_) => self.frame.malformed("rag", raw),
                }
            }
            RagEventKind::Done => {
                let duration_ms = self.started_at.elapsed().as_millis() as u64;
                log::info!(
                    "rag stream completed - session: {}, duration: {:.2}s",
                    self.session_id,
                    duration_ms as f64 / 1000.0
                );
                self.frame.done(None, Some(duration_ms), None);
            }
            RagEventKind::Error => {
                let message = match serde_json::from_str::<RagErrorEvent>(raw) {
                    Ok(event) => event.message,
                    Err(_) => {
                        self.frame.malformed("rag", raw);
                        None
                    }
                }
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Unknown stream error".to_string());
                log::error!("rag stream error: {}", message);
                self.frame.fail(message);
            }
            RagEventKind::Other(_label) => {
                #[cfg(debug_assertions)]
                log::debug!("rag stream event ignored: {}", _label);
            }
        }
    }
}

impl StreamTranscoder for RagTranscoder {
    fn provider(&self) -> &'static str {
        "rag"
    }

    fn open(&mut self) {
        let session_id = self.session_id.clone();
        self.frame.start(&session_id);
    }

    fn on_line(&mut self, line: &str) {
        if let Some(label) = sse::event_field(line) {
            self.current_event = Some(RagEventKind::from(label.trim()));
        } else if let Some(raw) = sse::data_field(line) {
            // A data line consumes the label, whatever it was
            if let Some(kind) = self.current_event.take() {
                self.on_data(kind, raw.trim());
            }
        }
    }

    fn frame(&mut self) -> &mut FrameState {
        &mut self.frame
    }
}
