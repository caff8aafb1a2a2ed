mod cache;
mod config;
mod error;
mod flow;
mod model;
mod render;
mod server;
mod service;
mod session;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use diagnosis_common::client::DiagnosisClient;
use diagnosis_common::redis::RedisCache;

use cache::SymptomCache;
use config::Config;
use server::ServerFactory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting symptom-flow MCP server");

    let config = Config::from_env()?;
    let health_client = DiagnosisClient::new(config.client.clone())?;
    info!(
        base_url = %health_client.config().base_url,
        timeout_ms = health_client.config().default_timeout.as_millis(),
        suggest_source = ?config.suggest_source,
        "diagnosis client configured"
    );

    match health_client.health().await {
        Ok(report) if report.is_healthy() => info!("diagnosis service healthy"),
        Ok(report) => warn!(status = %report.status, "diagnosis service reports unhealthy"),
        Err(e) => warn!(error = %e, "diagnosis service health check failed"),
    }

    let redis = RedisCache::new(config.redis_url.as_deref());
    if !redis.is_enabled() {
        info!("REDIS_URL not set, running without cache");
    } else if redis.is_available().await {
        info!("redis connected");
    } else {
        warn!("redis unavailable, running without cache");
    }
    let cache = Arc::new(SymptomCache::new(redis, config.catalog_ttl_secs));

    let factory = ServerFactory::new(config.client, cache, config.suggest_source);

    if let Some(addr) = config.tcp_listen_addr {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let factory = factory.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let server = factory.build()?;
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        let server = factory.build()?;
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
