use std::fmt;
use std::time::Instant;

use crate::agent::errors::{AgentError, AgentResult};
use crate::agent::types::{CanonicalStreamEvent, ChatTurnResult, StreamUsage};

/// Log target of per-turn telemetry records.
pub const TELEMETRY_TARGET: &str = "agent_telemetry";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(String),
    /// The consumer went away before the turn finished.
    Abandoned,
}

impl fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnOutcome::Completed => write!(f, "completed"),
            TurnOutcome::Failed(reason) => write!(f, "failed ({})", reason),
            TurnOutcome::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// A Drop guard that writes one telemetry record per turn.
///
/// The record is emitted when the guard is dropped, so a stream cut short by a
/// client disconnect is still accounted for, as `abandoned`.
pub struct TurnTelemetry {
    provider: &'static str,
    operation: &'static str,
    correlation_id: String,
    handle: Option<String>,
    started_at: Instant,
    outcome: Option<TurnOutcome>,
    usage: Option<StreamUsage>,
    delta_count: u64,
}

impl TurnTelemetry {
    pub fn begin(
        provider: &'static str,
        operation: &'static str,
        correlation_id: impl Into<String>,
    ) -> Self {
        let correlation_id = correlation_id.into();
        #[cfg(debug_assertions)]
        log::debug!(
            "{} {} started, correlation_id={}",
            provider,
            operation,
            correlation_id
        );
        Self {
            provider,
            operation,
            correlation_id,
            handle: None,
            started_at: Instant::now(),
            outcome: None,
            usage: None,
            delta_count: 0,
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn outcome(&self) -> Option<&TurnOutcome> {
        self.outcome.as_ref()
    }

    /// Follows a canonical stream as it is emitted.
    pub fn observe(&mut self, event: &CanonicalStreamEvent) {
        match event {
            CanonicalStreamEvent::Start {
                conversation_handle,
            } => {
                self.handle = Some(conversation_handle.clone());
            }
            CanonicalStreamEvent::Delta { .. } => {
                self.delta_count += 1;
            }
            CanonicalStreamEvent::Done { usage, error, .. } => {
                self.usage = *usage;
                self.outcome = Some(match error {
                    Some(reason) => TurnOutcome::Failed(reason.clone()),
                    None => TurnOutcome::Completed,
                });
            }
        }
    }

    /// Records the result of a non-streaming turn.
    pub fn record(&mut self, result: &AgentResult<ChatTurnResult>) {
        match result {
            Ok(turn) => {
                self.handle = Some(turn.conversation_handle.clone());
                self.outcome = Some(TurnOutcome::Completed);
            }
            Err(err) => self.fail(err),
        }
    }

    /// Records a turn that failed before producing anything.
    pub fn fail(&mut self, err: &AgentError) {
        self.outcome = Some(TurnOutcome::Failed(err.to_string()));
    }
}

impl Drop for TurnTelemetry {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or(TurnOutcome::Abandoned);
        let usage = self.usage.unwrap_or_default();
        log::info!(
            target: TELEMETRY_TARGET,
            "provider={} operation={} correlation_id={} handle={} outcome={} duration_ms={} deltas={} input_tokens={} output_tokens={}",
            self.provider,
            self.operation,
            self.correlation_id,
            self.handle.as_deref().unwrap_or("-"),
            outcome,
            self.started_at.elapsed().as_millis(),
            self.delta_count,
            usage.input_tokens,
            usage.output_tokens,
        );
    }
}
