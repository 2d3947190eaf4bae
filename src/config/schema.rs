//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! security pipeline. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the security pipeline server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Input sanitization settings.
    pub sanitize: SanitizeConfig,

    /// Pattern detection settings.
    pub detection: DetectionConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Threat monitor settings.
    pub monitor: MonitorConfig,

    /// Alert dispatch settings.
    pub alerts: AlertConfig,

    /// Admin read surface settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Input sanitization settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SanitizeConfig {
    /// Maximum string length; longer values are prefix-cut.
    pub max_length: usize,

    /// Trim leading/trailing whitespace from string values.
    pub trim_whitespace: bool,

    /// Strip encoded tag-like substrings after entity encoding.
    pub strip_tags: bool,

    /// Allow a fixed allowlist of HTML tags instead of encoding.
    pub allow_html: bool,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            max_length: 10_000,
            trim_whitespace: true,
            strip_tags: false,
            allow_html: false,
        }
    }
}

/// Pattern detection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Enable the detection middleware.
    pub enabled: bool,

    /// Exact payload paths skipped by sanitization and injection
    /// scanning. These fields carry generated prose that legitimately
    /// contains pattern-matching substrings.
    pub excluded_paths: Vec<String>,

    /// Maximum buffered request body size in bytes.
    pub max_body_size: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            excluded_paths: vec![
                "body.content".to_string(),
                "body.title".to_string(),
                "body.description".to_string(),
                "body.keyword".to_string(),
                "body.primaryKeyword".to_string(),
                "body.callToAction".to_string(),
            ],
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per second per IP.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 100,
            burst_size: 50,
        }
    }
}

/// Threat monitor settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Cleanup sweeper interval in seconds.
    pub sweep_interval_secs: u64,

    /// Capacity of the broadcast event feed.
    pub feed_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 3600,
            feed_capacity: 256,
        }
    }
}

/// Alert dispatch settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Enable alert dispatch for CRITICAL events.
    pub enabled: bool,

    /// Optional webhook URL; when absent alerts go to the log transport.
    pub webhook_url: Option<String>,

    /// Per-delivery timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            timeout_secs: 5,
        }
    }
}

/// Admin read surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin endpoints.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
