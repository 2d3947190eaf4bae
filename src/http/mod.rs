//! HTTP pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → rate_limit.rs (per-IP token bucket, emits RATE_LIMIT_EXCEEDED)
//!     → guard.rs (buffer, detect, sanitize; rejects on pattern match)
//!     → admin routes or downstream business handler
//! ```

pub mod guard;
pub mod rate_limit;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
