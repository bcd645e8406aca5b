//! Typed configuration of the bridge.
//!
//! The binary fills these structs from its command line and environment; the
//! library never reads the environment itself.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::agent::{AgentError, AgentResult};

pub const DEFAULT_API_VERSION: &str = "2025-11-15-preview";
pub const DEFAULT_PROJECT: &str = "galnet";
pub const DEFAULT_AGENT_NAME: &str = "galnet";
pub const DEFAULT_AGENT_TYPE: &str = "galnet";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_RAG_BASE_URL: &str = "https://ignitionrag.com";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

const PROJECTS_SEGMENT: &str = "/api/projects/";

// ===================================
// Provider selection
// ===================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Enterprise,
    Rag,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enterprise" | "azure" => Ok(ProviderKind::Enterprise),
            "rag" | "ignition" => Ok(ProviderKind::Rag),
            other => Err(format!(
                "unknown provider '{}', expected 'enterprise' or 'rag'",
                other
            )),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Enterprise => write!(f, "enterprise"),
            ProviderKind::Rag => write!(f, "rag"),
        }
    }
}

// ===================================
// Enterprise platform
// ===================================

#[derive(Clone)]
pub struct EnterpriseConfig {
    /// Project endpoint, `https://<host>/api/projects/<project>`.
    pub project_endpoint: String,
    /// Agent id as issued by the platform, `<name>:<version>`.
    pub agent_id: String,
    pub api_version: String,
    pub agent_type: String,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authority_host: String,
    /// Pre-issued bearer token, used when no client secret is configured.
    pub access_token: Option<String>,
}

impl Default for EnterpriseConfig {
    fn default() -> Self {
        Self {
            project_endpoint: String::new(),
            agent_id: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            agent_type: DEFAULT_AGENT_TYPE.to_string(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            access_token: None,
        }
    }
}

impl fmt::Debug for EnterpriseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnterpriseConfig")
            .field("project_endpoint", &self.project_endpoint)
            .field("agent_id", &self.agent_id)
            .field("api_version", &self.api_version)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl EnterpriseConfig {
    pub fn is_configured(&self) -> bool {
        !self.project_endpoint.trim().is_empty()
    }

    /// Name of the variable to set when the platform is not configured.
    pub fn missing(&self) -> &'static str {
        "AZURE_EXISTING_AIPROJECT_ENDPOINT"
    }

    /// The agent name: the part of the agent id before `:`.
    pub fn agent_name(&self) -> &str {
        self.agent_id
            .split(':')
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_AGENT_NAME)
    }

    /// The Responses API URL derived from the project endpoint.
    pub fn responses_url(&self) -> AgentResult<String> {
        if !self.is_configured() {
            return Err(AgentError::NotConfigured(self.missing().to_string()));
        }
        let endpoint = self.project_endpoint.trim().trim_end_matches('/');
        let (base, project) = match endpoint.rfind(PROJECTS_SEGMENT) {
            Some(pos) => {
                let project = &endpoint[pos + PROJECTS_SEGMENT.len()..];
                let project = if project.is_empty() || project.contains('/') {
                    DEFAULT_PROJECT
                } else {
                    project
                };
                (&endpoint[..pos], project)
            }
            None => (endpoint, DEFAULT_PROJECT),
        };
        Ok(format!(
            "{}/api/projects/{}/openai/responses?api-version={}",
            base, project, self.api_version
        ))
    }

    /// Tenant, client id and client secret, when all three are set.
    pub fn client_secret_credentials(&self) -> Option<(&str, &str, &str)> {
        Some((
            non_empty(&self.tenant_id)?,
            non_empty(&self.client_id)?,
            non_empty(&self.client_secret)?,
        ))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ===================================
// RAG service
// ===================================

#[derive(Clone)]
pub struct RagConfig {
    pub base_url: String,
    pub agent_id: String,
    pub api_key: String,
    pub agent_type: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RAG_BASE_URL.to_string(),
            agent_id: String::new(),
            api_key: String::new(),
            agent_type: DEFAULT_AGENT_TYPE.to_string(),
        }
    }
}

impl fmt::Debug for RagConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagConfig")
            .field("base_url", &self.base_url)
            .field("agent_id", &self.agent_id)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl RagConfig {
    pub fn is_configured(&self) -> bool {
        !self.agent_id.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    pub fn missing(&self) -> &'static str {
        "IGNITION_AGENT_ID or IGNITION_API_KEY"
    }

    fn base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    pub fn stream_url(&self) -> String {
        format!("{}/api/agents/{}/chat/stream", self.base(), self.agent_id.trim())
    }

    pub fn agents_url(&self) -> String {
        format!("{}/api/agents", self.base())
    }
}

// ===================================
// HTTP client, server and logging
// ===================================

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            user_agent: format!("agent-bridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builds the client shared by every outbound call.
///
/// Only connecting is bounded; a streaming body may stay open as long as the
/// vendor keeps talking.
pub fn build_http_client(config: &HttpClientConfig) -> AgentResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| AgentError::Network(format!("failed to build HTTP client: {}", e)))
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: log::LevelFilter,
    /// Detailed log file, in addition to the console.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Info,
            file: None,
        }
    }
}
