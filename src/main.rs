//! Fridge inventory service
//!
//! A small JSON service over an in-memory fridge, served by Axum and
//! routed by our own dispatcher.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum (timeout, request ID, trace)
//!                         │
//!                         ▼
//!                     Dispatcher ── buffer body, fix content type
//!                         │
//!                         ▼
//!                     Router ── most specific route wins
//!                         │
//!                         ▼
//!                     inventory handlers ──▶ ItemStore
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use fridge_service::config::{load_config, ServiceConfig};
use fridge_service::lifecycle::{signals, startup, Shutdown};
use fridge_service::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "fridge-service", version, about = "Fridge inventory HTTP service")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fridge-service starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_bytes = config.listener.max_body_bytes,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let server = startup::build_server(config)?;
    let listener = TcpListener::bind(&bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
