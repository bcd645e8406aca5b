use async_trait::async_trait;

use crate::agent::errors::AgentResult;
use crate::agent::transcoder::CanonicalByteStream;
use crate::agent::types::{ChatTurnRequest, ChatTurnResult, HealthResult};

/// A backend agent able to hold a conversation, in both calling conventions.
///
/// One implementation is chosen at start-up and shared as `Arc<dyn ProviderAdapter>`.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short provider name used in logs, e.g. `enterprise`.
    fn name(&self) -> &'static str;

    /// Value of the `agentType` field of turn results.
    fn agent_type(&self) -> &str;

    /// Opens a new conversation and waits for the complete answer.
    async fn start_chat(&self, request: &ChatTurnRequest) -> AgentResult<ChatTurnResult>;

    /// Continues the conversation named by the request's handle.
    ///
    /// A handle the vendor no longer knows starts a new conversation instead.
    /// Without a handle this behaves as `start_chat`.
    async fn continue_chat(&self, request: &ChatTurnRequest) -> AgentResult<ChatTurnResult>;

    /// Opens a turn as a canonical SSE stream.
    ///
    /// Fails only before the vendor accepted the request; once the stream is
    /// returned every failure is reported in-band by its `done` event.
    async fn start_chat_stream(&self, request: &ChatTurnRequest)
        -> AgentResult<CanonicalByteStream>;

    /// Probes the backend. Never fails: problems are reported in the result.
    async fn check_health(&self) -> HealthResult;
}
