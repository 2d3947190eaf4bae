//! Threat monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! Detectors / collaborators produce SecurityEvents:
//!     → ingest (log, upsert per-IP records, pattern analysis)
//!     → broadcast feed (observers, tests)
//!     → alert channel (CRITICAL only, drained by the dispatcher)
//!
//! Queries:
//!     → is_suspicious (middleware, admin check-ip)
//!     → stats (admin dashboard)
//!
//! Background:
//!     → sweeper evicts records idle past the retention window
//! ```
//!
//! # Design Decisions
//! - Record families are DashMaps: each ingest touches one shard for
//!   O(1)-O(20) work, queries iterate without a global lock
//! - Synthesized events never re-enter the counters they came from
//! - Ingestion is infallible; nothing here can fail a request

pub mod event;
pub mod ring;
pub mod sweeper;

use dashmap::DashMap;
use std::collections::HashMap;
use std::net::IpAddr;
use tokio::sync::{broadcast, mpsc};

use crate::observability::metrics;
use event::{now_millis, EventKind, SecurityEvent, Severity};
use ring::EventRing;

pub use sweeper::CleanupSweeper;

/// Capacity of the per-IP recent-event ring.
const RECENT_CAPACITY: usize = 100;

/// Number of ring entries inspected by pattern analysis.
const ANALYSIS_WINDOW: usize = 20;

/// LOGIN_FAILURE count in the window that classifies as brute force.
const BRUTE_FORCE_THRESHOLD: usize = 5;

/// UNAUTHORIZED_ACCESS count in the window that classifies as scanning.
const SCANNING_THRESHOLD: usize = 10;

/// Combined injection/XSS count that classifies as an injection campaign.
const INJECTION_THRESHOLD: usize = 3;

/// Event count above which a recently-active IP is suspicious.
const SUSPICION_EVENT_COUNT: u64 = 20;

/// Recency window for suspicion and the stats recent-event total.
const SUSPICION_WINDOW_MS: u64 = 60 * 60 * 1000;

/// Idle time after which the sweeper reclaims a record.
const RETENTION_MS: u64 = 24 * 60 * 60 * 1000;

/// Per-source activity record.
#[derive(Debug)]
struct IpActivityRecord {
    event_count: u64,
    last_seen: u64,
    recent: EventRing,
}

impl IpActivityRecord {
    fn new() -> Self {
        Self {
            event_count: 0,
            last_seen: 0,
            recent: EventRing::new(RECENT_CAPACITY),
        }
    }
}

#[derive(Debug)]
struct FailedLoginRecord {
    count: u64,
    last_attempt: u64,
}

#[derive(Debug)]
struct RateLimitViolationRecord {
    count: u64,
    last_violation: u64,
}

/// Aggregate monitor statistics.
#[derive(Debug, Clone, Copy)]
pub struct MonitorStats {
    pub suspicious_ips: usize,
    pub total_failed_logins: u64,
    pub total_rate_limit_violations: u64,
    pub recent_events: u64,
}

/// Stateful service maintaining per-source sliding activity windows and
/// synthesizing attack classifications from discrete events.
pub struct ThreatMonitor {
    ips: DashMap<IpAddr, IpActivityRecord>,
    failed_logins: DashMap<String, FailedLoginRecord>,
    rate_limit_violations: DashMap<IpAddr, RateLimitViolationRecord>,
    feed: broadcast::Sender<SecurityEvent>,
    alerts: mpsc::UnboundedSender<SecurityEvent>,
}

impl ThreatMonitor {
    /// Create a monitor. CRITICAL events are forwarded on `alerts`;
    /// delivery is somebody else's problem.
    pub fn new(feed_capacity: usize, alerts: mpsc::UnboundedSender<SecurityEvent>) -> Self {
        let (feed, _) = broadcast::channel(feed_capacity.max(1));
        Self {
            ips: DashMap::new(),
            failed_logins: DashMap::new(),
            rate_limit_violations: DashMap::new(),
            feed,
            alerts,
        }
    }

    /// Subscribe to the live event feed (synthesized events included).
    pub fn subscribe(&self) -> broadcast::Receiver<SecurityEvent> {
        self.feed.subscribe()
    }

    /// Ingest one event: log it, update per-source state, run pattern
    /// analysis, and trigger alerting for CRITICAL severities.
    pub fn ingest(&self, event: SecurityEvent) {
        self.ingest_at(event, now_millis());
    }

    fn ingest_at(&self, event: SecurityEvent, now: u64) {
        tracing::info!(
            target: "security_event",
            kind = event.kind.as_str(),
            severity = event.severity.as_str(),
            source_ip = %event.source_ip,
            path = %event.path,
            method = %event.method,
            synthetic = event.synthetic,
            "{}",
            event.message
        );
        metrics::record_event(event.kind.as_str(), event.severity.as_str());

        let _ = self.feed.send(event.clone());

        // Synthetic events update the alerting path only; feeding them
        // back into the counters they were derived from would let the
        // monitor amplify its own output unboundedly.
        if !event.synthetic {
            let window = {
                let mut record = self
                    .ips
                    .entry(event.source_ip)
                    .or_insert_with(IpActivityRecord::new);
                record.event_count += 1;
                record.last_seen = now;
                record.recent.push(event.kind);
                record.recent.last_n(ANALYSIS_WINDOW)
            };

            if event.kind == EventKind::LoginFailure {
                let key = format!("{}|{}", event.source_ip, event.identity());
                let mut record = self
                    .failed_logins
                    .entry(key)
                    .or_insert_with(|| FailedLoginRecord {
                        count: 0,
                        last_attempt: 0,
                    });
                record.count += 1;
                record.last_attempt = now;
            }

            if event.kind == EventKind::RateLimitExceeded {
                let mut record = self
                    .rate_limit_violations
                    .entry(event.source_ip)
                    .or_insert_with(|| RateLimitViolationRecord {
                        count: 0,
                        last_violation: 0,
                    });
                record.count += 1;
                record.last_violation = now;
            }

            // All guards are dropped here; re-ingestion below cannot
            // contend with this ingest.
            for synthesized in analyze_window(&window, &event) {
                self.ingest_at(synthesized, now);
            }
        }

        if event.severity == Severity::Critical {
            if self.alerts.send(event).is_err() {
                tracing::warn!("Alert channel closed, dropping critical event");
            }
        }
    }

    /// Whether an IP is currently considered suspicious: seen within the
    /// last hour with more than 20 accumulated events.
    pub fn is_suspicious(&self, ip: IpAddr) -> bool {
        self.is_suspicious_at(ip, now_millis())
    }

    fn is_suspicious_at(&self, ip: IpAddr, now: u64) -> bool {
        self.ips.get(&ip).is_some_and(|record| {
            now.saturating_sub(record.last_seen) < SUSPICION_WINDOW_MS
                && record.event_count > SUSPICION_EVENT_COUNT
        })
    }

    /// Aggregate statistics across all retained records.
    pub fn stats(&self) -> MonitorStats {
        self.stats_at(now_millis())
    }

    fn stats_at(&self, now: u64) -> MonitorStats {
        let mut suspicious_ips = 0;
        let mut recent_events = 0;
        for record in self.ips.iter() {
            let fresh = now.saturating_sub(record.last_seen) < SUSPICION_WINDOW_MS;
            if fresh {
                recent_events += record.event_count;
                if record.event_count > SUSPICION_EVENT_COUNT {
                    suspicious_ips += 1;
                }
            }
        }

        let total_failed_logins = self.failed_logins.iter().map(|r| r.count).sum();
        let total_rate_limit_violations =
            self.rate_limit_violations.iter().map(|r| r.count).sum();

        MonitorStats {
            suspicious_ips,
            total_failed_logins,
            total_rate_limit_violations,
            recent_events,
        }
    }

    /// Evict records idle past the retention window. Returns the number
    /// of records removed per family (ips, logins, rate limits).
    pub fn cleanup(&self) -> (usize, usize, usize) {
        self.cleanup_at(now_millis())
    }

    fn cleanup_at(&self, now: u64) -> (usize, usize, usize) {
        let cutoff = now.saturating_sub(RETENTION_MS);

        let before = self.ips.len();
        self.ips.retain(|_, record| record.last_seen >= cutoff);
        let evicted_ips = before - self.ips.len();

        let before = self.failed_logins.len();
        self.failed_logins
            .retain(|_, record| record.last_attempt >= cutoff);
        let evicted_logins = before - self.failed_logins.len();

        let before = self.rate_limit_violations.len();
        self.rate_limit_violations
            .retain(|_, record| record.last_violation >= cutoff);
        let evicted_limits = before - self.rate_limit_violations.len();

        metrics::record_tracked_ips(self.ips.len());
        (evicted_ips, evicted_logins, evicted_limits)
    }
}

/// Inspect the trailing window of one source's events and synthesize
/// higher-order classifications. Thresholds are re-evaluated on every
/// ingest, so a crossed threshold keeps firing while the window stays
/// saturated.
fn analyze_window(window: &[EventKind], trigger: &SecurityEvent) -> Vec<SecurityEvent> {
    let mut login_failures = 0;
    let mut unauthorized = 0;
    let mut injections = 0;
    for kind in window {
        match kind {
            EventKind::LoginFailure => login_failures += 1,
            EventKind::UnauthorizedAccess => unauthorized += 1,
            EventKind::SqlInjectionAttempt | EventKind::XssAttempt => injections += 1,
            _ => {}
        }
    }

    let mut synthesized = Vec::new();

    if login_failures >= BRUTE_FORCE_THRESHOLD {
        synthesized.push(classification(
            trigger,
            Severity::High,
            "brute_force",
            format!(
                "Repeated login failures from {} ({login_failures} in window)",
                trigger.source_ip
            ),
            login_failures,
        ));
    }

    if unauthorized >= SCANNING_THRESHOLD {
        synthesized.push(classification(
            trigger,
            Severity::High,
            "scanning",
            format!(
                "Repeated unauthorized access from {} ({unauthorized} in window)",
                trigger.source_ip
            ),
            unauthorized,
        ));
    }

    if injections >= INJECTION_THRESHOLD {
        synthesized.push(classification(
            trigger,
            Severity::Critical,
            "injection_attack",
            format!(
                "Injection campaign from {} ({injections} in window)",
                trigger.source_ip
            ),
            injections,
        ));
    }

    synthesized
}

fn classification(
    trigger: &SecurityEvent,
    severity: Severity,
    reason: &str,
    message: String,
    count: usize,
) -> SecurityEvent {
    let mut metadata = HashMap::new();
    metadata.insert("reason".to_string(), serde_json::json!(reason));
    metadata.insert("count".to_string(), serde_json::json!(count));
    metadata.insert("window".to_string(), serde_json::json!(ANALYSIS_WINDOW));

    let mut event = SecurityEvent::new(
        EventKind::SuspiciousRequest,
        severity,
        message,
        trigger.source_ip,
    )
    .with_request(trigger.method.clone(), trigger.path.clone())
    .with_user_agent(trigger.user_agent.clone())
    .with_metadata(metadata);
    event.synthetic = true;
    event
}
