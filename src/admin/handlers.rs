use axum::{
    extract::{ConnectInfo, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};

use crate::http::response::{validation_failed, FieldError};
use crate::http::server::AppState;
use crate::monitor::event::{now_millis, EventKind, SecurityEvent, Severity};

#[derive(Serialize)]
pub struct SecurityStats {
    #[serde(rename = "suspiciousIPs")]
    pub suspicious_ips: usize,
    #[serde(rename = "totalFailedLogins")]
    pub total_failed_logins: u64,
    #[serde(rename = "totalRateLimitViolations")]
    pub total_rate_limit_violations: u64,
    #[serde(rename = "recentEvents")]
    pub recent_events: u64,
    pub timestamp: u64,
}

#[derive(Serialize)]
pub struct IpCheck {
    pub ip: String,
    pub suspicious: bool,
    pub timestamp: u64,
}

#[derive(Serialize)]
pub struct EventLogged {
    #[serde(rename = "eventLogged")]
    pub event_logged: bool,
    pub timestamp: u64,
}

pub async fn get_stats(State(state): State<AppState>) -> Json<SecurityStats> {
    let stats = state.monitor.stats();
    Json(SecurityStats {
        suspicious_ips: stats.suspicious_ips,
        total_failed_logins: stats.total_failed_logins,
        total_rate_limit_violations: stats.total_rate_limit_violations,
        recent_events: stats.recent_events,
        timestamp: now_millis(),
    })
}

pub async fn check_ip(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Response {
    let Ok(parsed) = ip.parse::<Ipv4Addr>() else {
        return validation_failed(vec![FieldError {
            field: "ip",
            message: "must be an IPv4 address in dotted-quad form".to_string(),
        }]);
    };

    Json(IpCheck {
        ip: parsed.to_string(),
        suspicious: state.monitor.is_suspicious(parsed.into()),
        timestamp: now_millis(),
    })
    .into_response()
}

/// Manual event ingestion for operators. The event body is validated
/// against the type and severity enums before it reaches the monitor.
pub async fn log_event(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<Value>,
) -> Response {
    let mut errors = Vec::new();

    let kind = match body.get("type").and_then(Value::as_str) {
        Some(raw) => match raw.parse::<EventKind>() {
            Ok(kind) => Some(kind),
            Err(()) => {
                errors.push(FieldError {
                    field: "type",
                    message: format!("'{raw}' is not a known security event type"),
                });
                None
            }
        },
        None => {
            errors.push(FieldError {
                field: "type",
                message: "required".to_string(),
            });
            None
        }
    };

    let severity = match body.get("severity").and_then(Value::as_str) {
        Some(raw) => match raw.parse::<Severity>() {
            Ok(severity) => Some(severity),
            Err(()) => {
                errors.push(FieldError {
                    field: "severity",
                    message: format!("'{raw}' is not one of LOW, MEDIUM, HIGH, CRITICAL"),
                });
                None
            }
        },
        None => {
            errors.push(FieldError {
                field: "severity",
                message: "required".to_string(),
            });
            None
        }
    };

    let message = match body.get("message").and_then(Value::as_str) {
        Some(m) if !m.trim().is_empty() => Some(m.to_string()),
        Some(_) => {
            errors.push(FieldError {
                field: "message",
                message: "must not be empty".to_string(),
            });
            None
        }
        None => {
            errors.push(FieldError {
                field: "message",
                message: "required".to_string(),
            });
            None
        }
    };

    let metadata: Option<HashMap<String, Value>> = match body.get("metadata") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Some(_) => {
            errors.push(FieldError {
                field: "metadata",
                message: "must be an object".to_string(),
            });
            None
        }
    };

    if !errors.is_empty() {
        return validation_failed(errors);
    }

    // Validated above; the unwraps cannot fire once errors is empty.
    let mut event = SecurityEvent::new(
        kind.expect("validated"),
        severity.expect("validated"),
        message.expect("validated"),
        addr.ip(),
    )
    .with_request("POST", "/security/log-event");
    if let Some(metadata) = metadata {
        event = event.with_metadata(metadata);
    }
    state.monitor.ingest(event);

    Json(EventLogged {
        event_logged: true,
        timestamp: now_millis(),
    })
    .into_response()
}
