//! Static attack-pattern detection.
//!
//! # Data Flow
//! ```text
//! Buffered request:
//!     → injection.rs (field-by-field walk of body/query, exclusion-aware)
//!     → suspicious.rs (whole-payload signature scan, URL included)
//!     → first match rejects the request and becomes a SecurityEvent
//! ```
//!
//! # Design Decisions
//! - Pattern tables compile once at startup and are shared read-only
//! - Detectors are pure functions over the parsed payload; no state
//! - Matched path/reason feed event metadata, never the HTTP response

pub mod injection;
pub mod patterns;
pub mod suspicious;

pub use injection::{scan_sections, InjectionFinding};
pub use suspicious::scan_request;
