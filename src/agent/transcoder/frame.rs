use std::sync::atomic::{AtomicU64, Ordering};

use crate::agent::types::{CanonicalStreamEvent, StreamUsage};

/// Process-wide count of vendor stream fragments that could not be decoded.
static MALFORMED_FRAGMENTS: AtomicU64 = AtomicU64::new(0);

/// Number of malformed vendor fragments dropped since process start.
pub fn malformed_fragment_count() -> u64 {
    MALFORMED_FRAGMENTS.load(Ordering::Relaxed)
}

/// Emits canonical events while enforcing the `Start Delta* Done` grammar.
///
/// Transcoders report what the vendor said; this state decides what actually
/// goes out. A delta before any start gets a synthesised `Start`, anything
/// after `Done` is discarded.
#[derive(Debug, Default)]
pub struct FrameState {
    handle: String,
    started: bool,
    finished: bool,
    pending: Vec<CanonicalStreamEvent>,
    malformed: u64,
}

impl FrameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers a handle without emitting anything, unless one is already known.
    pub fn offer_handle(&mut self, handle: &str) {
        if self.handle.is_empty() && !handle.is_empty() {
            self.handle = handle.to_string();
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn start(&mut self, handle: &str) {
        if self.started || self.finished {
            return;
        }
        if !handle.is_empty() {
            self.handle = handle.to_string();
        }
        self.started = true;
        self.pending.push(CanonicalStreamEvent::Start {
            conversation_handle: self.handle.clone(),
        });
    }

    pub fn delta(&mut self, text: String) {
        if self.finished || text.is_empty() {
            return;
        }
        if !self.started {
            let handle = self.handle.clone();
            self.start(&handle);
        }
        self.pending.push(CanonicalStreamEvent::Delta { text });
    }

    pub fn done(
        &mut self,
        usage: Option<StreamUsage>,
        duration_ms: Option<u64>,
        error: Option<String>,
    ) {
        if self.finished {
            return;
        }
        if !self.started {
            let handle = self.handle.clone();
            self.start(&handle);
        }
        self.finished = true;
        self.pending.push(CanonicalStreamEvent::Done {
            conversation_handle: self.handle.clone(),
            usage,
            duration_ms,
            error,
        });
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.done(None, None, Some(error.into()));
    }

    /// Counts a fragment that could not be decoded. The stream carries on.
    pub fn malformed(&mut self, provider: &str, fragment: &str) {
        self.malformed += 1;
        MALFORMED_FRAGMENTS.fetch_add(1, Ordering::Relaxed);
        log::debug!("{} dropped malformed stream fragment: {}", provider, fragment);
    }

    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn drain(&mut self) -> Vec<CanonicalStreamEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_before_start_synthesises_start() {
        let mut frame = FrameState::new();
        frame.offer_handle("r9");
        frame.delta("hi".to_string());
        assert_eq!(
            frame.drain(),
            vec![
                CanonicalStreamEvent::Start {
                    conversation_handle: "r9".to_string()
                },
                CanonicalStreamEvent::Delta {
                    text: "hi".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_only_one_done_is_emitted() {
        let mut frame = FrameState::new();
        frame.start("r1");
        frame.done(None, None, None);
        frame.done(None, None, Some("late".to_string()));
        frame.delta("ignored".to_string());
        let events = frame.drain();
        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
        assert!(frame.is_finished());
    }

    #[test]
    fn test_second_start_is_ignored() {
        let mut frame = FrameState::new();
        frame.start("r1");
        frame.start("r2");
        assert_eq!(frame.drain().len(), 1);
        assert_eq!(frame.handle(), "r1");
    }

    #[test]
    fn test_malformed_fragments_are_counted() {
        let before = malformed_fragment_count();
        let mut frame = FrameState::new();
        frame.malformed("test", "{\"partial");
        frame.malformed("test", "{oops");
        assert_eq!(frame.malformed_count(), 2);
        assert!(malformed_fragment_count() >= before + 2);
        assert!(frame.drain().is_empty());
    }
}
