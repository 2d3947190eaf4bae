//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the pipeline middleware and handlers
//! - Wire up middleware (request ID, tracing, timeout, rate limit, guard)
//! - Mount the admin read surface and the CSP report endpoint
//! - Spawn the background tasks (alert dispatcher, cleanup sweeper)
//! - Bind server to listener and drain on shutdown

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, post},
    Json, Router,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::alert::AlertDispatcher;
use crate::config::GuardConfig;
use crate::http::guard::guard_middleware;
use crate::http::rate_limit::{rate_limit_middleware, RateLimiterState};
use crate::lifecycle::Shutdown;
use crate::monitor::event::{EventKind, SecurityEvent, Severity};
use crate::monitor::{CleanupSweeper, ThreatMonitor};
use crate::sanitize::SanitizeOptions;

/// Application state injected into middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GuardConfig>,
    pub monitor: Arc<ThreatMonitor>,
    pub exclusions: Arc<HashSet<String>>,
    pub sanitize_opts: Arc<SanitizeOptions>,
}

/// HTTP server hosting the security pipeline.
pub struct HttpServer {
    router: Router,
    config: Arc<GuardConfig>,
    monitor: Arc<ThreatMonitor>,
    alerts_rx: mpsc::UnboundedReceiver<SecurityEvent>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// The threat monitor and the alert channel are constructed here,
    /// once, and injected into the middleware chain; nothing in the
    /// pipeline reaches for globals.
    pub fn new(config: GuardConfig) -> Self {
        let config = Arc::new(config);
        let (alerts_tx, alerts_rx) = mpsc::unbounded_channel();
        let monitor = Arc::new(ThreatMonitor::new(config.monitor.feed_capacity, alerts_tx));

        let state = AppState {
            config: config.clone(),
            monitor: monitor.clone(),
            exclusions: Arc::new(config.detection.excluded_paths.iter().cloned().collect()),
            sanitize_opts: Arc::new(SanitizeOptions::from(&config.sanitize)),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            monitor,
            alerts_rx,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GuardConfig, state: AppState) -> Router {
        let rate_limiter = Arc::new(RateLimiterState::new(
            &config.rate_limit,
            state.monitor.clone(),
        ));

        let mut router = Router::new()
            .route("/security/csp-report", post(csp_report))
            .route("/", any(downstream_handler))
            .route("/{*path}", any(downstream_handler))
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(admin::security_admin_router(state.clone()));
        }

        router
            .layer(middleware::from_fn_with_state(state, guard_middleware))
            .layer(middleware::from_fn_with_state(
                rate_limiter,
                rate_limit_middleware,
            ))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// Handle on the monitor, for operators embedding the server.
    pub fn monitor(&self) -> Arc<ThreatMonitor> {
        self.monitor.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        // Background tasks owned by this lifecycle.
        let dispatcher = AlertDispatcher::new(&self.config.alerts, self.alerts_rx);
        tokio::spawn(dispatcher.run(shutdown.subscribe()));

        let sweeper = CleanupSweeper::new(
            self.monitor.clone(),
            Duration::from_secs(self.config.monitor.sweep_interval_secs),
        );
        tokio::spawn(sweeper.run(shutdown.subscribe()));

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let mut server_shutdown = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Stand-in for downstream business handlers: echoes what survived the
/// pipeline so callers (and tests) can observe exactly what the
/// business layer would receive.
async fn downstream_handler(request: Request<Body>) -> Response {
    let (_parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_else(|_| Bytes::new());
    let received: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    Json(serde_json::json!({
        "status": "ok",
        "received": received,
    }))
    .into_response()
}

/// CSP violation ingestion.
///
/// Always answers 204, even for garbage: the reporting contract says
/// reporting must never itself be penalized.
async fn csp_report(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> StatusCode {
    match serde_json::from_slice::<Value>(&body) {
        Ok(report) => {
            let mut metadata = HashMap::new();
            if let Some(details) = report.get("csp-report") {
                metadata.insert("report".to_string(), details.clone());
            }
            state.monitor.ingest(
                SecurityEvent::new(
                    EventKind::CspViolation,
                    Severity::Low,
                    "Content Security Policy violation reported",
                    addr.ip(),
                )
                .with_request("POST", "/security/csp-report")
                .with_metadata(metadata),
            );
        }
        Err(e) => {
            tracing::debug!(error = %e, "Discarding malformed CSP report");
        }
    }

    StatusCode::NO_CONTENT
}
