//! Re-framing of vendor event streams into the canonical `start`/`delta`/`done` protocol.
//!
//! The pipeline is pull-based: the client pulls a canonical event, which pulls
//! upstream chunks until at least one event is ready. Nothing is spawned, so
//! dropping the canonical stream drops the vendor response and releases its
//! connection.
//!
//! ```text
//! vendor bytes -> LineBuffer (partial line carry) -> StreamTranscoder::on_line
//!              -> FrameState (grammar) -> CanonicalStreamEvent -> SSE bytes
//! ```

mod decoder;
mod enterprise;
mod frame;
mod line_buffer;
mod rag;
pub mod sse;

pub use decoder::{collect_turn, CanonicalEventDecoder, CollectedTurn};
pub use enterprise::EnterpriseTranscoder;
pub use frame::{malformed_fragment_count, FrameState};
pub use line_buffer::LineBuffer;
pub use rag::RagTranscoder;


use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use crate::agent::telemetry::TurnTelemetry;
use crate::agent::types::CanonicalStreamEvent;

pub const UPSTREAM_ENDED_EARLY: &str = "Upstream stream ended before completion";

/// Canonical events of one turn, in emission order.
pub type CanonicalEventStream = Pin<Box<dyn Stream<Item = CanonicalStreamEvent> + Send>>;

/// The canonical stream encoded as `text/event-stream` frames.
pub type CanonicalByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

type UpstreamBytes = Pin<Box<dyn Stream<Item = Result<Bytes, String>> + Send>>;

/// Interprets the complete lines of one vendor's stream.
///
/// Implementations push what the vendor said into their [`FrameState`]; the
/// driver drains it after every chunk.
pub trait StreamTranscoder: Send {
    fn provider(&self) -> &'static str;

    /// Called once before the first upstream chunk is read.
    fn open(&mut self) {}

    /// Called for every complete line, terminators stripped.
    fn on_line(&mut self, line: &str);

    /// Called when the upstream closes. A stream that ends without its
    /// terminal event is a failed turn.
    fn on_end(&mut self) {
        self.frame().fail(UPSTREAM_ENDED_EARLY);
    }

    /// Called when reading the upstream fails mid-stream.
    fn on_error(&mut self, message: &str) {
        self.frame()
            .fail(format!("Upstream stream error: {}", message));
    }

    fn frame(&mut self) -> &mut FrameState;
}

struct Pump<T> {
    upstream: Option<UpstreamBytes>,
    lines: LineBuffer,
    transcoder: T,
    queue: VecDeque<CanonicalStreamEvent>,
    telemetry: Option<TurnTelemetry>,
}

impl<T: StreamTranscoder> Pump<T> {
    fn collect(&mut self) {
        let events = self.transcoder.frame().drain();
        if let Some(telemetry) = self.telemetry.as_mut() {
            events.iter().for_each(|event| telemetry.observe(event));
        }
        self.queue.extend(events);

        if self.transcoder.frame().is_finished() {
            self.release();
        }
    }

    /// Drops the vendor stream once the turn is over.
    fn release(&mut self) {
        if self.upstream.take().is_none() {
            return;
        }
        let malformed = self.transcoder.frame().malformed_count();
        if malformed > 0 {
            log::warn!(
                "{} stream dropped {} malformed fragment(s)",
                self.transcoder.provider(),
                malformed
            );
        }
    }

    fn on_chunk(&mut self, chunk: &[u8]) {
        for line in self.lines.push(chunk) {
            self.transcoder.on_line(&line);
        }
    }

    fn on_upstream_end(&mut self) {
        if let Some(line) = self.lines.finish() {
            self.transcoder.on_line(&line);
        }
        self.transcoder.on_end();
    }
}

/// Transcodes a vendor byte stream into canonical events.
///
/// The returned stream always follows `Start Delta* Done`, whatever the vendor
/// sends. Upstream read errors become a `Done` carrying the error.
pub fn transcode_events<S, E, T>(
    upstream: S,
    mut transcoder: T,
    telemetry: Option<TurnTelemetry>,
) -> CanonicalEventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
    T: StreamTranscoder + 'static,
{
    let upstream: UpstreamBytes = Box::pin(upstream.map(|item| item.map_err(|e| e.to_string())));
    transcoder.open();

    let mut pump = Pump {
        upstream: Some(upstream),
        lines: LineBuffer::new(),
        transcoder,
        queue: VecDeque::new(),
        telemetry,
    };
    pump.collect();

    Box::pin(stream::unfold(pump, |mut pump| async move {
        loop {
            if let Some(event) = pump.queue.pop_front() {
                return Some((event, pump));
            }

            let upstream = pump.upstream.as_mut()?;
            match upstream.next().await {
                Some(Ok(chunk)) => pump.on_chunk(&chunk),
                Some(Err(e)) => {
                    log::error!("{} upstream stream error: {}", pump.transcoder.provider(), e);
                    pump.transcoder.on_error(&e);
                }
                None => pump.on_upstream_end(),
            }
            pump.collect();
        }
    }))
}

/// Encodes canonical events as SSE frames.
pub fn into_sse_bytes(events: CanonicalEventStream) -> CanonicalByteStream {
    Box::pin(events.map(|event| Ok::<_, std::io::Error>(Bytes::from(event.to_sse()))))
}

/// Transcodes a vendor byte stream straight into canonical SSE bytes.
pub fn transcode<S, E, T>(
    upstream: S,
    transcoder: T,
    telemetry: Option<TurnTelemetry>,
) -> CanonicalByteStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
    T: StreamTranscoder + 'static,
{
    into_sse_bytes(transcode_events(upstream, transcoder, telemetry))
}
