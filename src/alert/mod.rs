//! Best-effort alert dispatch for CRITICAL events.
//!
//! The monitor hands CRITICAL events over an unbounded channel; this
//! dispatcher drains it in the background. Delivery is bounded by a
//! per-event timeout and failures are logged and counted only — a slow
//! or failing transport must never delay a request.

use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time;

use crate::config::AlertConfig;
use crate::monitor::event::SecurityEvent;
use crate::observability::metrics;

/// Where alerts go.
enum AlertTransport {
    /// Structured error-level log line; the default.
    Log,
    /// POST the event JSON to a webhook.
    Webhook { url: String, client: reqwest::Client },
}

/// Background task draining the alert channel.
pub struct AlertDispatcher {
    rx: mpsc::UnboundedReceiver<SecurityEvent>,
    transport: AlertTransport,
    timeout: Duration,
    enabled: bool,
}

impl AlertDispatcher {
    pub fn new(config: &AlertConfig, rx: mpsc::UnboundedReceiver<SecurityEvent>) -> Self {
        let transport = match &config.webhook_url {
            Some(url) => AlertTransport::Webhook {
                url: url.clone(),
                client: reqwest::Client::new(),
            },
            None => AlertTransport::Log,
        };
        Self {
            rx,
            transport,
            timeout: Duration::from_secs(config.timeout_secs),
            enabled: config.enabled,
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if !self.enabled {
            tracing::info!("Alert dispatch disabled");
            return;
        }

        tracing::info!("Alert dispatcher starting");

        loop {
            tokio::select! {
                event = self.rx.recv() => {
                    match event {
                        Some(event) => self.deliver(event).await,
                        None => break,
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Alert dispatcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn deliver(&self, event: SecurityEvent) {
        match &self.transport {
            AlertTransport::Log => {
                tracing::error!(
                    target: "security_alert",
                    kind = event.kind.as_str(),
                    source_ip = %event.source_ip,
                    path = %event.path,
                    "SECURITY ALERT: {}",
                    event.message
                );
                metrics::record_alert("logged");
            }
            AlertTransport::Webhook { url, client } => {
                let send = client.post(url).json(&event).send();
                match time::timeout(self.timeout, send).await {
                    Ok(Ok(response)) if response.status().is_success() => {
                        metrics::record_alert("delivered");
                    }
                    Ok(Ok(response)) => {
                        tracing::warn!(status = %response.status(), "Alert webhook rejected event");
                        metrics::record_alert("rejected");
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Alert webhook delivery failed");
                        metrics::record_alert("failed");
                    }
                    Err(_) => {
                        tracing::warn!(timeout = ?self.timeout, "Alert webhook delivery timed out");
                        metrics::record_alert("timeout");
                    }
                }
            }
        }
    }
}
