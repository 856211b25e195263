//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use fridge_service::config::ServiceConfig;
use fridge_service::lifecycle::{startup, Shutdown};
use tokio::net::TcpListener;

/// Start the service on `addr` and wait until it accepts connections.
///
/// The returned handle stops the server when triggered.
pub async fn start_server(addr: SocketAddr) -> Shutdown {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = addr.to_string();
    config.observability.metrics_enabled = false;

    let server = startup::build_server(config).unwrap();
    let listener = TcpListener::bind(addr).await.unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

/// A client that never reuses connections between tests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
