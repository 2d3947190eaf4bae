//! Periodic eviction of stale monitor state.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::monitor::ThreatMonitor;

/// Background task that reclaims records idle past the retention window.
///
/// Owned by the server lifecycle: started on init, stopped through the
/// shutdown broadcast. Monitor state is ephemeral, so cancellation at
/// any point loses nothing.
pub struct CleanupSweeper {
    monitor: Arc<ThreatMonitor>,
    interval: Duration,
}

impl CleanupSweeper {
    pub fn new(monitor: Arc<ThreatMonitor>, interval: Duration) -> Self {
        Self { monitor, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Cleanup sweeper starting"
        );

        let mut ticker = time::interval(self.interval);
        // The first tick fires immediately; skip it so a fresh start
        // does not sweep an empty monitor.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let (ips, logins, limits) = self.monitor.cleanup();
                    if ips + logins + limits > 0 {
                        tracing::info!(
                            evicted_ips = ips,
                            evicted_failed_logins = logins,
                            evicted_rate_limits = limits,
                            "Swept stale monitor records"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cleanup sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
