//! Security event types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Current time as unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The kind of a security-relevant occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    LoginSuccess,
    LoginFailure,
    RateLimitExceeded,
    SuspiciousRequest,
    SqlInjectionAttempt,
    XssAttempt,
    UnauthorizedAccess,
    PasswordResetRequest,
    AccountLockout,
    CspViolation,
    CorsViolation,
    FileUploadViolation,
    SessionHijackAttempt,
}

impl EventKind {
    /// Wire spelling, also used as a metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::LoginSuccess => "LOGIN_SUCCESS",
            EventKind::LoginFailure => "LOGIN_FAILURE",
            EventKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            EventKind::SuspiciousRequest => "SUSPICIOUS_REQUEST",
            EventKind::SqlInjectionAttempt => "SQL_INJECTION_ATTEMPT",
            EventKind::XssAttempt => "XSS_ATTEMPT",
            EventKind::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            EventKind::PasswordResetRequest => "PASSWORD_RESET_REQUEST",
            EventKind::AccountLockout => "ACCOUNT_LOCKOUT",
            EventKind::CspViolation => "CSP_VIOLATION",
            EventKind::CorsViolation => "CORS_VIOLATION",
            EventKind::FileUploadViolation => "FILE_UPLOAD_VIOLATION",
            EventKind::SessionHijackAttempt => "SESSION_HIJACK_ATTEMPT",
        }
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOGIN_SUCCESS" => Ok(EventKind::LoginSuccess),
            "LOGIN_FAILURE" => Ok(EventKind::LoginFailure),
            "RATE_LIMIT_EXCEEDED" => Ok(EventKind::RateLimitExceeded),
            "SUSPICIOUS_REQUEST" => Ok(EventKind::SuspiciousRequest),
            "SQL_INJECTION_ATTEMPT" => Ok(EventKind::SqlInjectionAttempt),
            "XSS_ATTEMPT" => Ok(EventKind::XssAttempt),
            "UNAUTHORIZED_ACCESS" => Ok(EventKind::UnauthorizedAccess),
            "PASSWORD_RESET_REQUEST" => Ok(EventKind::PasswordResetRequest),
            "ACCOUNT_LOCKOUT" => Ok(EventKind::AccountLockout),
            "CSP_VIOLATION" => Ok(EventKind::CspViolation),
            "CORS_VIOLATION" => Ok(EventKind::CorsViolation),
            "FILE_UPLOAD_VIOLATION" => Ok(EventKind::FileUploadViolation),
            "SESSION_HIJACK_ATTEMPT" => Ok(EventKind::SessionHijackAttempt),
            _ => Err(()),
        }
    }
}

/// Severity of a security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(()),
        }
    }
}

/// An immutable record of one observed security-relevant occurrence.
///
/// Created at the point of detection, consumed once by the threat
/// monitor, never mutated. State is ephemeral; nothing survives a
/// process restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub kind: EventKind,

    pub severity: Severity,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    pub source_ip: IpAddr,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    pub path: String,
    pub method: String,

    /// Unix milliseconds.
    pub timestamp: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,

    /// Set on events the monitor synthesizes from pattern analysis.
    /// Synthetic events feed the alerting path but not the per-source
    /// counters they were derived from.
    #[serde(default, skip_serializing)]
    pub synthetic: bool,
}

impl SecurityEvent {
    /// Create an event with the given kind, severity and message.
    pub fn new(
        kind: EventKind,
        severity: Severity,
        message: impl Into<String>,
        source_ip: IpAddr,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            message: message.into(),
            user_id: None,
            email: None,
            source_ip,
            user_agent: None,
            path: String::new(),
            method: String::new(),
            timestamp: now_millis(),
            metadata: None,
            synthetic: false,
        }
    }

    pub fn with_request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.method = method.into();
        self.path = path.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Identity component for failed-login bookkeeping: email, else user
    /// id, else "unknown".
    pub fn identity(&self) -> &str {
        self.email
            .as_deref()
            .or(self.user_id.as_deref())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_to_wire_spelling() {
        let json = serde_json::to_string(&EventKind::SqlInjectionAttempt).unwrap();
        assert_eq!(json, "\"SQL_INJECTION_ATTEMPT\"");
        let json = serde_json::to_string(&EventKind::CspViolation).unwrap();
        assert_eq!(json, "\"CSP_VIOLATION\"");
    }

    #[test]
    fn kind_round_trips_through_from_str() {
        for kind in [
            EventKind::LoginSuccess,
            EventKind::LoginFailure,
            EventKind::RateLimitExceeded,
            EventKind::SuspiciousRequest,
            EventKind::SqlInjectionAttempt,
            EventKind::XssAttempt,
            EventKind::UnauthorizedAccess,
            EventKind::PasswordResetRequest,
            EventKind::AccountLockout,
            EventKind::CspViolation,
            EventKind::CorsViolation,
            EventKind::FileUploadViolation,
            EventKind::SessionHijackAttempt,
        ] {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
        assert!("NOT_A_KIND".parse::<EventKind>().is_err());
    }

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn identity_prefers_email() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let mut event = SecurityEvent::new(EventKind::LoginFailure, Severity::Medium, "login failed", ip);
        assert_eq!(event.identity(), "unknown");

        event.user_id = Some("u-42".to_string());
        assert_eq!(event.identity(), "u-42");

        event.email = Some("a@b.example".to_string());
        assert_eq!(event.identity(), "a@b.example");
    }
}
