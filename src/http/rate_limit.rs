//! Per-IP rate limiting middleware.
//!
//! Violations answer 429 and feed `RATE_LIMIT_EXCEEDED` events into the
//! threat monitor, where repeated violations raise the source's
//! suspicion.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::RateLimitConfig;
use crate::http::guard::EXEMPT_PATHS;
use crate::monitor::event::{EventKind, SecurityEvent, Severity};
use crate::monitor::ThreatMonitor;
use crate::observability::metrics;

/// A simple token bucket.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared state for the per-IP rate limiter.
pub struct RateLimiterState {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    monitor: Arc<ThreatMonitor>,
    enabled: bool,
    rps: f64,
    burst: f64,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig, monitor: Arc<ThreatMonitor>) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            monitor,
            enabled: config.enabled,
            rps: f64::from(config.requests_per_second),
            burst: f64::from(config.burst_size).max(1.0),
        }
    }

    fn check(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::new(self.burst));

        bucket.try_acquire(self.burst, self.rps)
    }
}

/// Middleware function for per-IP rate limiting.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled || EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let ip = addr.ip();
    if state.check(ip) {
        next.run(request).await
    } else {
        tracing::warn!(client = %ip, "Rate limit exceeded");
        metrics::record_rate_limited();

        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        state.monitor.ingest(
            SecurityEvent::new(
                EventKind::RateLimitExceeded,
                Severity::Medium,
                "Rate limit exceeded",
                ip,
            )
            .with_request(method, path),
        );

        (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn limiter(rps: u32, burst: u32) -> RateLimiterState {
        let (alerts_tx, _alerts_rx) = mpsc::unbounded_channel();
        let monitor = Arc::new(ThreatMonitor::new(16, alerts_tx));
        RateLimiterState::new(
            &RateLimitConfig {
                enabled: true,
                requests_per_second: rps,
                burst_size: burst,
            },
            monitor,
        )
    }

    #[test]
    fn burst_is_honored_then_exhausted() {
        let state = limiter(1, 3);
        let ip: IpAddr = "10.9.0.1".parse().unwrap();

        assert!(state.check(ip));
        assert!(state.check(ip));
        assert!(state.check(ip));
        assert!(!state.check(ip), "bucket should be empty after the burst");
    }

    #[test]
    fn buckets_are_per_ip() {
        let state = limiter(1, 1);
        assert!(state.check("10.9.0.2".parse().unwrap()));
        assert!(state.check("10.9.0.3".parse().unwrap()));
    }
}
