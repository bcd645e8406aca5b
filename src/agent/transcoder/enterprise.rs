use super::{sse, FrameState, StreamTranscoder};
use crate::agent::types::responses::ResponseStreamEnvelope;
use crate::agent::types::StreamUsage;

const DONE_SENTINEL: &str = "[DONE]";

/// Re-frames the Responses API event stream.
///
/// Each `data:` line holds one JSON envelope with a `type` discriminator; the
/// conversation handle is the vendor's own response id from `response.created`.
#[derive(Debug, Default)]
pub struct EnterpriseTranscoder {
    frame: FrameState,
    usage: Option<StreamUsage>,
}

impl EnterpriseTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn on_envelope(&mut self, envelope: ResponseStreamEnvelope) {
        if let Some(id) = envelope.response_id.as_deref() {
            self.frame.offer_handle(id);
        }

        match envelope.kind.as_str() {
            "response.created" => {
                if let Some(response) = envelope.response.filter(|r| !r.id.is_empty()) {
                    self.frame.start(&response.id);
                }
            }
            "response.output_text.delta" => {
                if let Some(delta) = envelope.delta {
                    self.frame.delta(delta);
                }
            }
            "response.completed" => {
                if let Some(response) = envelope.response {
                    self.frame.offer_handle(&response.id);
                    if let Some(usage) = response.usage {
                        self.usage = Some(usage.into());
                    }
                }
                self.frame.done(self.usage, None, None);
            }
            "response.failed" | "response.incomplete" => {
                let reason = envelope
                    .response
                    .map(|r| match r.error {
                        Some(error) if !error.message.is_empty() => error.message,
                        _ => format!("Response not completed: {}", r.status),
                    })
                    .unwrap_or_else(|| format!("Response not completed: {}", envelope.kind));
                log::error!("enterprise stream ended with {}: {}", envelope.kind, reason);
                self.frame.fail(reason);
            }
            "error" => {
                let reason = envelope
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Unknown stream error".to_string());
                log::error!("enterprise stream error: {}", reason);
                self.frame.fail(reason);
            }
            _other => {
                #[cfg(debug_assertions)]
                log::debug!("enterprise stream event ignored: {}", _other);
            }
        }
    }
}

impl StreamTranscoder for EnterpriseTranscoder {
    fn provider(&self) -> &'static str {
        "enterprise"
    }

    fn on_line(&mut self, line: &str) {
        let Some(data) = sse::data_field(line) else {
            return;
        };
        let data = data.trim();
        if data.is_empty() {
            return;
        }
        if data == DONE_SENTINEL {
            self.frame.done(self.usage, None, None);
            return;
        }

        match serde_json::from_str::<ResponseStreamEnvelope>(data) {
            Ok(envelope) => self.on_envelope(envelope),
            Err(_) => self.frame.malformed("enterprise", data),
        }
    }

    fn frame(&mut self) -> &mut FrameState {
        &mut self.frame
    }
}
