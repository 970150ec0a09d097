//! HTTP middleware shared by every route

pub mod metrics;
pub mod security_headers;

pub use metrics::{metrics_middleware, HttpMetrics};
pub use security_headers::security_headers_middleware;
