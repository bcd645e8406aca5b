use std::future::Future;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};

use super::router::routes;
use crate::agent::ProviderAdapter;
use crate::config::ServerConfig;

/// Serves the routes on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    adapter: Arc<dyn ProviderAdapter>,
    shutdown: F,
) -> Result<(), String>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().map_err(|e| {
        log::error!("Failed to get local address: {}", e);
        e.to_string()
    })?;
    log::info!(
        "Serving {} agent bridge on http://{}",
        adapter.name(),
        addr
    );

    axum::serve(listener, routes(adapter))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| {
            log::error!("HTTP server failed: {}", e);
            e.to_string()
        })?;

    log::info!("HTTP server shut down gracefully");
    Ok(())
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn start_http_server(
    config: &ServerConfig,
    adapter: Arc<dyn ProviderAdapter>,
) -> Result<(), String> {
    let addr = config.socket_addr().map_err(|e| {
        log::error!("Invalid listen address {}:{}: {}", config.host, config.port, e);
        e.to_string()
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        log::error!("Failed to bind {}: {}", addr, e);
        e.to_string()
    })?;

    serve(listener, adapter, async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for ctrl_c: {}", e);
            return;
        }
        log::info!("HTTP server received shutdown signal");
    })
    .await
}
