//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use ingress_guard::{GuardConfig, HttpServer, Shutdown, ThreatMonitor};

pub const TEST_API_KEY: &str = "test-admin-key";

/// A config suitable for tests: fixed admin key, no metrics exporter.
pub fn test_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.admin.api_key = TEST_API_KEY.to_string();
    config.observability.metrics_enabled = false;
    config
}

/// Spawn a pipeline server on an ephemeral port.
///
/// Returns the bound address, a handle on the monitor for direct event
/// injection/inspection, and the shutdown trigger.
pub async fn spawn_guard(config: GuardConfig) -> (SocketAddr, Arc<ThreatMonitor>, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    let monitor = server.monitor();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the accept loop a moment to come up.
    tokio::time::sleep(Duration::from_millis(200)).await;

    (addr, monitor, shutdown)
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
