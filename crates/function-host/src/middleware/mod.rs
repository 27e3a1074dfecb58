//! HTTP middleware for the function host.
//!
//! - `auth` - bearer token guard for protected routes
//! - `http_metrics` - request count and latency for every response

pub mod auth;
pub mod http_metrics;

pub use auth::require_auth;
pub use http_metrics::http_metrics_middleware;
