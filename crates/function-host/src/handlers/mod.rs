//! HTTP request handlers for the function host.

pub mod health;
pub mod metrics;
pub mod test_auth;
pub mod test_chat;
pub mod tools;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use test_auth::test_auth;
pub use test_chat::test_chat;
pub use tools::invoke_tool;
