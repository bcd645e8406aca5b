use async_trait::async_trait;
use reqwest::{header, Client};
use std::sync::Arc;
use std::time::Instant;

use super::continuity::continue_with_recovery;
use super::credential::{
    ClientSecretTokenSource, CredentialCache, StaticTokenSource, TokenSource,
    UnavailableTokenSource,
};
use super::elapsed_ms;
use super::errors::{AgentError, AgentResult};
use super::telemetry::TurnTelemetry;
use super::traits::ProviderAdapter;
use super::transcoder::{transcode, CanonicalByteStream, EnterpriseTranscoder};
use super::types::responses::{AgentReference, ResponsesApiResponse, ResponsesRequest};
use super::types::{ChatTurnRequest, ChatTurnResult, HealthResult};
use crate::config::EnterpriseConfig;

const PROVIDER: &str = "enterprise";

/// Talks to a hosted agent through the platform's Responses API.
///
/// The conversation handle is the id of the previous response, sent back as
/// `previous_response_id`; the platform keeps the history itself.
pub struct EnterpriseAgentAdapter {
    client: Client,
    config: EnterpriseConfig,
    credentials: Arc<CredentialCache>,
}

impl EnterpriseAgentAdapter {
    pub fn new(client: Client, config: EnterpriseConfig) -> Self {
        let credentials = Arc::new(CredentialCache::new(token_source(&client, &config)));
        Self::with_credentials(client, config, credentials)
    }

    pub fn with_credentials(
        client: Client,
        config: EnterpriseConfig,
        credentials: Arc<CredentialCache>,
    ) -> Self {
        Self {
            client,
            config,
            credentials,
        }
    }

    fn payload(
        &self,
        message: &str,
        previous_response_id: Option<&str>,
        stream: bool,
    ) -> ResponsesRequest {
        ResponsesRequest {
            agent: AgentReference::named(self.config.agent_name()),
            input: message.to_string(),
            stream,
            previous_response_id: previous_response_id.map(str::to_string),
        }
    }

    /// Sends one Responses call and rejects non-success statuses.
    async fn post(&self, payload: &ResponsesRequest) -> AgentResult<reqwest::Response> {
        let url = self.config.responses_url()?;
        let credential = self.credentials.get_valid_credential().await?;

        #[cfg(debug_assertions)]
        log::debug!(
            "enterprise request to {}: {}",
            url,
            serde_json::to_string(payload).unwrap_or_default()
        );

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&credential.token)
            .json(payload);
        if payload.stream {
            request = request.header(header::ACCEPT, "text/event-stream");
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("enterprise agent returned {}: {}", status, body);
            return Err(AgentError::Upstream {
                status_code: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// One synchronous turn; `previous_response_id` chains it to a conversation.
    async fn run_turn(
        &self,
        request: &ChatTurnRequest,
        previous_response_id: Option<&str>,
    ) -> AgentResult<ChatTurnResult> {
        let started = Instant::now();
        log::info!(
            "enterprise turn with agent {}, previous_response_id: {}",
            self.config.agent_name(),
            previous_response_id.unwrap_or("-")
        );

        let response = self
            .post(&self.payload(&request.message, previous_response_id, false))
            .await?;
        let body = response.text().await?;
        let data: ResponsesApiResponse = serde_json::from_str(&body)?;

        log::info!(
            "enterprise response received in {:.2}s - status: {}",
            started.elapsed().as_secs_f64(),
            data.status
        );
        if !data.is_completed() {
            return Err(AgentError::IncompleteResponse {
                status: data.status,
            });
        }

        let answer = data.output_text();
        #[cfg(debug_assertions)]
        log::debug!(
            "enterprise answer: {}",
            answer.chars().take(100).collect::<String>()
        );
        Ok(ChatTurnResult::completed(
            &request.message,
            answer,
            data.id,
            &self.config.agent_type,
        ))
    }
}

/// Picks how credentials are issued from what is configured.
pub fn token_source(client: &Client, config: &EnterpriseConfig) -> Arc<dyn TokenSource> {
    if let Some((tenant_id, client_id, client_secret)) = config.client_secret_credentials() {
        return Arc::new(ClientSecretTokenSource::new(
            client.clone(),
            &config.authority_host,
            tenant_id,
            client_id,
            client_secret,
        ));
    }
    if let Some(token) = config
        .access_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Arc::new(StaticTokenSource::new(token, chrono::Duration::hours(1)));
    }
    if config.is_configured() {
        log::warn!("no Azure credential configured, enterprise calls will fail to authenticate");
    }
    Arc::new(UnavailableTokenSource)
}

#[async_trait]
impl ProviderAdapter for EnterpriseAgentAdapter {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn agent_type(&self) -> &str {
        &self.config.agent_type
    }

    async fn start_chat(&self, request: &ChatTurnRequest) -> AgentResult<ChatTurnResult> {
        let mut telemetry =
            TurnTelemetry::begin(PROVIDER, "start_chat", request.correlation_id_or_new());
        let result = self.run_turn(request, None).await;
        telemetry.record(&result);
        result
    }

    async fn continue_chat(&self, request: &ChatTurnRequest) -> AgentResult<ChatTurnResult> {
        let Some(handle) = request.handle() else {
            return self.start_chat(request).await;
        };

        let mut telemetry =
            TurnTelemetry::begin(PROVIDER, "continue_chat", request.correlation_id_or_new());
        let result = continue_with_recovery(
            PROVIDER,
            handle,
            || self.run_turn(request, Some(handle)),
            || self.run_turn(request, None),
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
        log::info!(
            "enterprise streaming turn with agent {}, previous_response_id: {}",
            self.config.agent_name(),
            request.handle().unwrap_or("-")
        );

        let payload = self.payload(&request.message, request.handle(), true);
        let response = match self.post(&payload).await {
            Ok(response) => response,
            Err(err) => {
                telemetry.fail(&err);
                return Err(err);
            }
        };

        Ok(transcode(
            response.bytes_stream(),
            EnterpriseTranscoder::new(),
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

        // A credential is all the platform offers to probe
        let started = Instant::now();
        match self.credentials.get_valid_credential().await {
            Ok(_) => HealthResult::online(elapsed_ms(started)),
            Err(err) => {
                log::warn!("enterprise health check failed: {}", err);
                self.credentials.invalidate();
                HealthResult::offline(elapsed_ms(started), err.to_string())
            }
        }
    }
}
