//! The security pipeline middleware.
//!
//! Buffers the request, scans the parsed payload with the pattern
//! detectors, and forwards a sanitized copy downstream. A detector
//! match fails the request (fail-closed); everything else in here
//! degrades to pass-through (fail-open for the monitor).

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::detect::{scan_request, scan_sections};
use crate::http::response;
use crate::http::server::AppState;
use crate::monitor::event::{EventKind, SecurityEvent, Severity};
use crate::observability::metrics;
use crate::sanitize::sanitize_value_excluding;

/// Sanitized query parameters, made available to downstream handlers
/// through request extensions (the query string itself is immutable).
#[derive(Debug, Clone)]
pub struct SanitizedQuery(pub Value);

/// Paths exempt from the pipeline and the rate limiter. CSP reports
/// must never be rejected, and they routinely contain the very
/// substrings the detectors match.
pub const EXEMPT_PATHS: [&str; 1] = ["/security/csp-report"];

pub async fn guard_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.detection.enabled || EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let original_uri = request.uri().to_string();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let query_string = request.uri().query().unwrap_or("").to_string();

    let (mut parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.config.detection.max_body_size).await {
        Ok(bytes) => bytes,
        Err(_) => {
            metrics::record_rejected("payload_too_large");
            return response::payload_too_large();
        }
    };

    let body_value = parse_json_body(&parts.headers, &bytes);
    let query_value = parse_query(&query_string);

    // Detection runs on the parsed original payload; entity encoding
    // would otherwise plant `;` artifacts for the metacharacter pattern
    // to trip over.
    if let Some(finding) = scan_sections(
        &[("body", &body_value), ("query", &query_value)],
        &state.exclusions,
    ) {
        tracing::warn!(
            source_ip = %addr.ip(),
            path = %path,
            matched_path = %finding.path,
            reason = finding.reason,
            "Rejected request: injection pattern"
        );
        let mut metadata = HashMap::new();
        metadata.insert("matchedPath".to_string(), serde_json::json!(finding.path));
        metadata.insert("reason".to_string(), serde_json::json!(finding.reason));
        state.monitor.ingest(
            SecurityEvent::new(
                EventKind::SqlInjectionAttempt,
                Severity::High,
                "SQL injection pattern in request payload",
                addr.ip(),
            )
            .with_request(method, path)
            .with_user_agent(user_agent)
            .with_metadata(metadata),
        );
        metrics::record_rejected("injection");
        return response::invalid_input();
    }

    if let Some(reason) = scan_request(&original_uri, &body_value, &query_value) {
        tracing::warn!(
            source_ip = %addr.ip(),
            path = %path,
            reason = reason,
            "Rejected request: suspicious pattern"
        );
        let mut metadata = HashMap::new();
        metadata.insert("reason".to_string(), serde_json::json!(reason));
        state.monitor.ingest(
            SecurityEvent::new(
                EventKind::SuspiciousRequest,
                Severity::Medium,
                "Suspicious signature in request",
                addr.ip(),
            )
            .with_request(method, path)
            .with_user_agent(user_agent)
            .with_metadata(metadata),
        );
        metrics::record_rejected("suspicious");
        return response::invalid_input();
    }

    // Forward a sanitized copy. Excluded prose fields pass through
    // byte-identical.
    let forward = if body_value.is_null() {
        bytes
    } else {
        let sanitized = sanitize_value_excluding(
            "body",
            &body_value,
            &state.sanitize_opts,
            &state.exclusions,
        );
        match serde_json::to_vec(&sanitized) {
            Ok(buf) => {
                if let Ok(len) = HeaderValue::from_str(&buf.len().to_string()) {
                    parts.headers.insert(header::CONTENT_LENGTH, len);
                }
                Bytes::from(buf)
            }
            Err(_) => bytes,
        }
    };

    parts.extensions.insert(SanitizedQuery(sanitize_value_excluding(
        "query",
        &query_value,
        &state.sanitize_opts,
        &state.exclusions,
    )));

    let request = Request::from_parts(parts, Body::from(forward));
    next.run(request).await
}

/// Parse a JSON body, degrading to `Null` on anything unparseable.
fn parse_json_body(headers: &axum::http::HeaderMap, bytes: &Bytes) -> Value {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);
    if !is_json || bytes.is_empty() {
        return Value::Null;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable JSON body, skipping field scan");
            Value::Null
        }
    }
}

/// Decode the query string into a flat JSON object.
fn parse_query(query: &str) -> Value {
    if query.is_empty() {
        return Value::Object(Map::new());
    }
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        map.insert(key.into_owned(), Value::String(value.into_owned()));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parses_into_object() {
        let parsed = parse_query("q=hello&page=2");
        assert_eq!(parsed["q"], "hello");
        assert_eq!(parsed["page"], "2");
    }

    #[test]
    fn query_decodes_percent_escapes() {
        let parsed = parse_query("q=1%27%20OR%20%271%27%3D%271");
        assert_eq!(parsed["q"], "1' OR '1'='1");
    }

    #[test]
    fn empty_query_is_empty_object() {
        assert_eq!(parse_query(""), Value::Object(Map::new()));
    }
}
