use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Instant;
use uuid::Uuid;

use super::continuity::continue_with_recovery;
use super::elapsed_ms;
use super::errors::{AgentError, AgentResult};
use super::telemetry::TurnTelemetry;
use super::traits::ProviderAdapter;
use super::transcoder::{
    collect_turn, transcode, transcode_events, CanonicalByteStream, RagTranscoder,
};
use super::types::rag::RagChatRequest;
use super::types::{ChatTurnRequest, ChatTurnResult, HealthResult, HistoryEntry};
use crate::config::RagConfig;

const PROVIDER: &str = "rag";

/// A fresh client-side session id; the RAG service has no ids of its own.
pub fn new_session_id() -> String {
    format!("session_{}", Uuid::new_v4().simple())
}

/// Talks to the hosted RAG service.
///
/// The service only streams, so the synchronous calls collect the stream. It
/// keeps no memory across calls beyond what the client sends as history.
pub struct RagServiceAdapter {
    client: Client,
    config: RagConfig,
}

impl RagServiceAdapter {
    pub fn new(client: Client, config: RagConfig) -> Self {
        Self { client, config }
    }

    /// Opens the vendor stream and rejects non-success statuses.
    async fn open_stream(
        &self,
        query: &str,
        session_id: &str,
        history: &[HistoryEntry],
    ) -> AgentResult<reqwest::Response> {
        if !self.config.is_configured() {
            return Err(AgentError::NotConfigured(self.config.missing().to_string()));
        }

        log::info!(
            "rag chat, session: {}, history entries: {}",
            session_id,
            history.len()
        );
        let body = RagChatRequest {
            query,
            session_id,
            history,
        };
        let response = self
            .client
            .post(self.config.stream_url())
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("rag service returned {}: {}", status, body);
            return Err(AgentError::Upstream {
                status_code: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// One turn, collected from the stream.
    async fn run_turn(
        &self,
        request: &ChatTurnRequest,
        session_id: &str,
        history: &[HistoryEntry],
    ) -> AgentResult<ChatTurnResult> {
        let response = self
            .open_stream(&request.message, session_id, history)
            .await?;
        let turn = collect_turn(transcode_events(
            response.bytes_stream(),
            RagTranscoder::new(session_id),
            None,
        ))
        .await;

        if let Some(error) = turn.error {
            log::error!("rag turn for session {} did not complete: {}", session_id, error);
            return Err(AgentError::IncompleteResponse { status: error });
        }
        Ok(ChatTurnResult::completed(
            &request.message,
            turn.text,
            session_id.to_string(),
            &self.config.agent_type,
        ))
    }
}

#[async_trait]
impl ProviderAdapter for RagServiceAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn agent_type(&self) -> &str {
        &self.config.agent_type
    }

    async fn start_chat(&self, request: &ChatTurnRequest) -> AgentResult<ChatTurnResult> {
        let mut telemetry =
            TurnTelemetry::begin(PROVIDER, "start_chat", request.correlation_id_or_new());
        let result = self.run_turn(request, &new_session_id(), &[]).await;
        telemetry.record(&result);
        result
    }

    async fn continue_chat(&self, request: &ChatTurnRequest) -> AgentResult<ChatTurnResult> {
        let Some(session_id) = request.handle() else {
            return self.start_chat(request).await;
        };

        let mut telemetry =
            TurnTelemetry::begin(PROVIDER, "continue_chat", request.correlation_id_or_new());
        let result = continue_with_recovery(
            PROVIDER,
            session_id,
            || self.run_turn(request, session_id, &request.prior_history),
            || {
                let fresh = new_session_id();
                async move { self.run_turn(request, &fresh, &[]).await }
            },
        )
        .await;
        telemetry.record(&result);
        result
    }

    async fn start_chat_stream(
        &self,
        request: &ChatTurnRequest,
    ) -> AgentResult<CanonicalByteStream> {
        let mut telemetry =
            TurnTelemetry::begin(PROVIDER, "stream", request.correlation_id_or_new());

        let (session_id, history) = match request.handle() {
            Some(handle) => (handle.to_string(), request.prior_history.as_slice()),
            None => (new_session_id(), &[][..]),
        };
        let response = match self
            .open_stream(&request.message, &session_id, history)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                telemetry.fail(&err);
                return Err(err);
            }
        };

        Ok(transcode(
            response.bytes_stream(),
            RagTranscoder::new(session_id),
            Some(telemetry),
        ))
    }

    async fn check_health(&self) -> HealthResult {
        if !self.config.is_configured() {
            return HealthResult::not_configured(format!(
                "{} not configured",
                self.config.missing()
            ));
        }

        let started = Instant::now();
        let response = self
            .client
            .get(self.config.agents_url())
            .bearer_auth(&self.config.api_key)
            .send()
            .await;
        match response {
            Ok(response) if response.status().is_success() => {
                HealthResult::online(elapsed_ms(started))
            }
            Ok(response) => {
                let status = response.status().as_u16();
                log::warn!("rag health check returned {}", status);
                HealthResult::offline(elapsed_ms(started), format!("API returned {}", status))
            }
            Err(e) => {
                log::warn!("rag health check failed: {}", e);
                HealthResult::offline(elapsed_ms(started), e.to_string())
            }
        }
    }
}
