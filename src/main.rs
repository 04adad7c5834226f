//! static-server
//!
//! Serves canned HTTP responses declared in a document or in `StaticAPI`
//! resources, reloading the routing table whenever the declared state changes.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                    STATIC SERVER                      │
//!                  │                                                      │
//!   endpoints.yaml │  ┌─────────────┐   build    ┌──────────────┐         │
//!   ───────────────┼─▶│ FileSource  │──────────▶│              │         │
//!   StaticAPI list │  ├─────────────┤  (off-lock)│  LiveTable   │         │
//!   ───────────────┼─▶│ClusterSource│──────────▶│  (ArcSwap)   │         │
//!                  │  └─────────────┘   swap     └──────┬───────┘         │
//!                  │                                     │ snapshot        │
//!   Request        │  ┌─────────┐    ┌──────────┐  ┌────▼──────┐          │
//!   ───────────────┼─▶│  tls?   │───▶│  layers  │─▶│ dispatch  │          │
//!   Response       │  └─────────┘    │ id/trace │  │ 200/404/  │          │
//!   ◀──────────────┼────────────────│ timeout  │◀─│ 405       │          │
//!                  │                 └──────────┘  └───────────┘          │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;

use static_server::config::{validate_config, Cli, ServerConfig};
use static_server::http::HttpServer;
use static_server::lifecycle::{spawn_signal_handler, Shutdown};
use static_server::net::load_tls_config;
use static_server::observability::{init_logging, init_metrics};
use static_server::routing::LiveTable;
use static_server::source::cluster::SERVICE_ACCOUNT_DIR;
use static_server::source::{resolve_namespace, ClusterSource, ConfigSource, FileSource, KubeStaticApiLister};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config: ServerConfig = Cli::parse().into();

    init_logging(&config.observability.log_level, config.observability.log_format)?;

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "static-server starting");

    if rustls::crypto::aws_lc_rs::default_provider().install_default().is_err() {
        tracing::debug!("Crypto provider already installed");
    }

    if let Some(address) = config.observability.metrics_address {
        init_metrics(address)?;
    }

    let live = LiveTable::new();
    let source = build_source(&config).await?;

    // The first load is fatal; later failures keep the current table.
    let outcome = source.sync(&live).await?;
    tracing::info!(
        source = source.name(),
        outcome = ?outcome,
        endpoints = live.snapshot().len(),
        "Initial routing table loaded"
    );

    let tls = if config.tls.enabled {
        Some(load_tls_config(&config.tls)?)
    } else {
        None
    };

    let address = resolve_bind_address(&config.listener.bind_address()).await?;

    let shutdown = Shutdown::new();
    let watch = tokio::spawn(source.clone().watch(live.clone(), shutdown.subscribe()));
    spawn_signal_handler(shutdown.clone());

    let mut server = HttpServer::new(live, address, config.listener.request_timeout());
    if let Some(tls) = tls {
        server = server.with_tls(tls);
    }
    let served = server.run(shutdown.subscribe()).await;

    // Stop the watch loop even when the server exits on its own.
    shutdown.trigger();
    if let Err(error) = watch.await {
        tracing::error!(error = %error, "Watch task failed");
    }

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn build_source(config: &ServerConfig) -> Result<Arc<dyn ConfigSource>, Box<dyn std::error::Error>> {
    if config.source.in_cluster {
        let client = kube::Client::try_default().await?;
        let namespace = resolve_namespace(
            config.source.namespace.as_deref(),
            std::path::Path::new(SERVICE_ACCOUNT_DIR),
        );
        tracing::info!(namespace = %namespace, "Reading StaticAPI resources");
        Ok(Arc::new(ClusterSource::new(
            Arc::new(KubeStaticApiLister::new(client)),
            namespace,
        )))
    } else {
        tracing::info!(path = %config.source.endpoints_file.display(), "Reading endpoints file");
        Ok(Arc::new(FileSource::new(config.source.endpoints_file.clone())))
    }
}

async fn resolve_bind_address(address: &str) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    tokio::net::lookup_host(address)
        .await?
        .next()
        .ok_or_else(|| format!("bind address {address} did not resolve").into())
}
