use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use agent_bridge::{
    agent::build_adapter,
    config::{
        build_http_client, EnterpriseConfig, HttpClientConfig, LogConfig, ProviderKind,
        RagConfig, ServerConfig, DEFAULT_API_VERSION, DEFAULT_AGENT_TYPE, DEFAULT_AUTHORITY_HOST,
        DEFAULT_RAG_BASE_URL,
    },
    http::start_http_server,
    logger::setup_logger,
};

#[derive(Parser, Debug)]
#[command(name = "agent-bridge", version, about = "Streaming bridge to hosted AI agents")]
struct Cli {
    /// Backend serving every route: `enterprise` or `rag`
    #[arg(long, env = "AGENT_PROVIDER", default_value = "enterprise")]
    provider: ProviderKind,

    #[arg(long, env = "AGENT_BRIDGE_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "AGENT_BRIDGE_PORT", default_value_t = 3000)]
    port: u16,

    #[arg(long, env = "AGENT_BRIDGE_LOG_LEVEL", default_value = "info")]
    log_level: log::LevelFilter,

    /// Also write a detailed log to this file
    #[arg(long, env = "AGENT_BRIDGE_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Value of `agentType` in chat responses
    #[arg(long, env = "AGENT_BRIDGE_AGENT_TYPE", default_value = DEFAULT_AGENT_TYPE)]
    agent_type: String,

    #[command(flatten)]
    enterprise: EnterpriseArgs,

    #[command(flatten)]
    rag: RagArgs,
}

#[derive(clap::Args, Debug)]
struct EnterpriseArgs {
    #[arg(long, env = "AZURE_EXISTING_AIPROJECT_ENDPOINT", default_value = "")]
    azure_endpoint: String,

    #[arg(long, env = "AZURE_EXISTING_AGENT_ID", default_value = "")]
    azure_agent_id: String,

    #[arg(long, env = "AZURE_API_VERSION", default_value = DEFAULT_API_VERSION)]
    azure_api_version: String,

    #[arg(long, env = "AZURE_TENANT_ID")]
    azure_tenant_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_ID")]
    azure_client_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    azure_client_secret: Option<String>,

    #[arg(long, env = "AZURE_AUTHORITY_HOST", default_value = DEFAULT_AUTHORITY_HOST)]
    azure_authority_host: String,

    /// Pre-issued bearer token, used when no client secret is configured
    #[arg(long, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
    azure_access_token: Option<String>,
}

#[derive(clap::Args, Debug)]
struct RagArgs {
    #[arg(long, env = "IGNITION_API_BASE_URL", default_value = DEFAULT_RAG_BASE_URL)]
    ignition_base_url: String,

    #[arg(long, env = "IGNITION_AGENT_ID", default_value = "")]
    ignition_agent_id: String,

    #[arg(long, env = "IGNITION_API_KEY", default_value = "", hide_env_values = true)]
    ignition_api_key: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logger(&LogConfig {
        level: cli.log_level,
        file: cli.log_file.clone(),
    })
    .context("failed to set up logger")?;

    let enterprise = EnterpriseConfig {
        project_endpoint: cli.enterprise.azure_endpoint,
        agent_id: cli.enterprise.azure_agent_id,
        api_version: cli.enterprise.azure_api_version,
        agent_type: cli.agent_type.clone(),
        tenant_id: cli.enterprise.azure_tenant_id,
        client_id: cli.enterprise.azure_client_id,
        client_secret: cli.enterprise.azure_client_secret,
        authority_host: cli.enterprise.azure_authority_host,
        access_token: cli.enterprise.azure_access_token,
    };
    let rag = RagConfig {
        base_url: cli.rag.ignition_base_url,
        agent_id: cli.rag.ignition_agent_id,
        api_key: cli.rag.ignition_api_key,
        agent_type: cli.agent_type,
    };

    let client = build_http_client(&HttpClientConfig::default())?;
    let adapter = build_adapter(cli.provider, client, enterprise, rag);
    log::info!("agent-bridge {} using {} backend", env!("CARGO_PKG_VERSION"), cli.provider);

    let server = ServerConfig {
        host: cli.host,
        port: cli.port,
    };
    start_http_server(&server, adapter)
        .await
        .map_err(anyhow::Error::msg)?;
    Ok(())
}
