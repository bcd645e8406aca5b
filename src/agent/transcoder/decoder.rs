use futures_util::{Stream, StreamExt};

use super::{sse, LineBuffer};
use crate::agent::types::{CanonicalStreamEvent, StreamUsage};

/// Parses the canonical SSE wire format back into events, as a chat client does.
#[derive(Debug, Default)]
pub struct CanonicalEventDecoder {
    lines: LineBuffer,
}

impl CanonicalEventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<CanonicalStreamEvent> {
        self.lines
            .push(chunk)
            .iter()
            .filter_map(|line| parse_line(line))
            .collect()
    }

    pub fn finish(&mut self) -> Vec<CanonicalStreamEvent> {
        self.lines
            .finish()
            .and_then(|line| parse_line(&line))
            .into_iter()
            .collect()
    }
}

fn parse_line(line: &str) -> Option<CanonicalStreamEvent> {
    let data = sse::data_field(line)?.trim();
    if data.is_empty() {
        return None;
    }
    match serde_json::from_str(data) {
        Ok(event) => Some(event),
        Err(e) => {
            log::warn!("unreadable canonical event: {}, line: {}", e, line);
            None
        }
    }
}

/// A turn reassembled from its canonical events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedTurn {
    pub conversation_handle: String,
    pub text: String,
    pub usage: Option<StreamUsage>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub completed: bool,
}

impl CollectedTurn {
    pub fn apply(&mut self, event: CanonicalStreamEvent) {
        match event {
            CanonicalStreamEvent::Start {
                conversation_handle,
            } => {
                self.conversation_handle = conversation_handle;
            }
            CanonicalStreamEvent::Delta { text } => self.text.push_str(&text),
            CanonicalStreamEvent::Done {
                conversation_handle,
                usage,
                duration_ms,
                error,
            } => {
                if !conversation_handle.is_empty() {
                    self.conversation_handle = conversation_handle;
                }
                self.usage = usage;
                self.duration_ms = duration_ms;
                self.error = error;
                self.completed = true;
            }
        }
    }
}

/// Drains a canonical event stream into the complete answer.
pub async fn collect_turn<S>(mut events: S) -> CollectedTurn
where
    S: Stream<Item = CanonicalStreamEvent> + Unpin,
{
    let mut turn = CollectedTurn::default();
    while let Some(event) = events.next().await {
        turn.apply(event);
    }
    turn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_reads_canonical_frames() {
        let mut decoder = CanonicalEventDecoder::new();
        let mut events = decoder.push(b"data: {\"type\":\"start\",\"responseId\":\"r1\"}\n\nda");
        events.extend(decoder.push(b"ta: {\"type\":\"delta\",\"content\":\"pong\"}\n\n"));
        events.extend(decoder.push(b"data: {\"type\":\"done\",\"responseId\":\"r1\"}"));
        events.extend(decoder.finish());

        let mut turn = CollectedTurn::default();
        events.into_iter().for_each(|e| turn.apply(e));
        assert_eq!(turn.conversation_handle, "r1");
        assert_eq!(turn.text, "pong");
        assert!(turn.completed);
        assert_eq!(turn.error, None);
    }
}
