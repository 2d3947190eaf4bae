//! Request security pipeline library.

pub mod admin;
pub mod alert;
pub mod config;
pub mod detect;
pub mod http;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod sanitize;

pub use config::schema::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use monitor::ThreatMonitor;
