use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;

use crate::agent::errors::{AgentError, AgentResult};

/// A credential is refreshed once it is this close to expiry.
pub const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Audience of the enterprise agent platform.
pub const ENTERPRISE_SCOPE: &str = "https://ai.azure.com/.default";

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Usable until five minutes before its actual expiry.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::minutes(REFRESH_MARGIN_MINUTES) < self.expires_at
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

// Keep tokens out of logs
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues bearer credentials for the enterprise platform.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> AgentResult<Credential>;
}

/// Caches the enterprise credential and refreshes it lazily.
///
/// The slot lock is only held to read or replace the credential, never across
/// the network call, so concurrent callers may refresh at the same time. The
/// last writer wins, which is harmless since every fetched credential is valid.
pub struct CredentialCache {
    source: Arc<dyn TokenSource>,
    slot: RwLock<Option<Credential>>,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            slot: RwLock::new(None),
        }
    }

    pub async fn get_valid_credential(&self) -> AgentResult<Credential> {
        let cached = self.slot.read().clone();
        if let Some(credential) = cached.filter(Credential::is_fresh) {
            return Ok(credential);
        }

        log::debug!("refreshing enterprise credential");
        let credential = self.source.fetch().await?;
        if !credential.is_fresh() {
            return Err(AgentError::AuthFailure(format!(
                "identity provider issued a credential expiring at {}",
                credential.expires_at
            )));
        }

        *self.slot.write() = Some(credential.clone());
        log::info!(
            "enterprise credential refreshed, expires at {}",
            credential.expires_at
        );
        Ok(credential)
    }

    /// Drops the cached credential; the next call fetches a new one.
    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth2 client-credentials grant against the directory's token endpoint.
pub struct ClientSecretTokenSource {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

impl ClientSecretTokenSource {
    pub fn new(
        client: reqwest::Client,
        authority_host: &str,
        tenant_id: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                authority_host.trim_end_matches('/'),
                tenant_id
            ),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: ENTERPRISE_SCOPE.to_string(),
        }
    }
}

#[async_trait]
impl TokenSource for ClientSecretTokenSource {
    async fn fetch(&self) -> AgentResult<Credential> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AgentError::AuthFailure(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::AuthFailure(format!("token response unreadable: {}", e)))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or_else(|_| body.clone());
            log::error!("token endpoint returned {}: {}", status, body);
            return Err(AgentError::AuthFailure(format!(
                "token endpoint returned {}: {}",
                status.as_u16(),
                reason
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::AuthFailure(format!("token response malformed: {}", e)))?;
        let lifetime = token.expires_in.unwrap_or(3600);
        Ok(Credential::new(
            token.access_token,
            Utc::now() + Duration::seconds(lifetime),
        ))
    }
}

/// A pre-issued token with a fixed lifetime.
pub struct StaticTokenSource {
    token: String,
    lifetime: Duration,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            token: token.into(),
            lifetime,
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch(&self) -> AgentResult<Credential> {
        Ok(Credential::new(self.token.clone(), Utc::now() + self.lifetime))
    }
}

/// Stands in when no credential is configured; every fetch fails.
pub struct UnavailableTokenSource;

#[async_trait]
impl TokenSource for UnavailableTokenSource {
    async fn fetch(&self) -> AgentResult<Credential> {
        Err(AgentError::AuthFailure(
            "no Azure credential configured".to_string(),
        ))
    }
}
