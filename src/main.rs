//! Request security pipeline server.
//!
//! Sanitizes every inbound request, statically detects injection/XSS
//! attack patterns, and maintains a per-source adaptive threat model
//! that escalates discrete events into attack classifications and
//! alerts.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │               SECURITY PIPELINE               │
//!                    │                                              │
//!   Client Request   │  ┌──────────┐   ┌─────────┐   ┌───────────┐ │
//!   ─────────────────┼─▶│rate limit│──▶│  guard  │──▶│ downstream│ │
//!                    │  └────┬─────┘   │sanitize+│   │  handlers │ │
//!                    │       │         │ detect  │   └───────────┘ │
//!                    │       │         └────┬────┘                 │
//!                    │       ▼              ▼                      │
//!                    │  ┌──────────────────────────┐   ┌─────────┐ │
//!                    │  │      threat monitor      │──▶│  alert  │ │
//!                    │  │ per-IP windows, analysis │   │dispatch │ │
//!                    │  └──────────┬───────────────┘   └─────────┘ │
//!                    │             ▼                               │
//!                    │  ┌──────────────────────────┐               │
//!                    │  │ admin: stats / check-ip /│               │
//!                    │  │ log-event / csp-report   │               │
//!                    │  └──────────────────────────┘               │
//!                    └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ingress_guard::config::loader::load_config;
use ingress_guard::{GuardConfig, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "ingress-guard")]
#[command(about = "Request security pipeline server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ingress_guard=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("ingress-guard v{} starting", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        detection_enabled = config.detection.enabled,
        excluded_paths = config.detection.excluded_paths.len(),
        rate_limit_enabled = config.rate_limit.enabled,
        sweep_interval_secs = config.monitor.sweep_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => ingress_guard::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_shutdown.trigger();
        }
    });

    let server = HttpServer::new(config);
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
