//! Function Host Library
//!
//! Core of an Azure Functions custom handler that serves a small set of
//! MCP-style tools over HTTP, guarded by bearer tokens issued by the
//! Microsoft identity platform:
//!
//! - RS256 token verification against a cached JWKS key set
//! - Audience, issuer and lifetime policy checks
//! - Test endpoints for exercising the authentication path
//! - Tool invocation (greeting, snippets, current time, mock weather)
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/*.rs -> services/*.rs
//!                         |
//!                  auth/authorizer.rs -> auth/jwt.rs, auth/jwks.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Key set cache, token verification and the authorizer
//! - `config` - Host configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Auth guard and request metrics
//! - `models` - Request and response bodies
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - Tool implementations and snippet storage

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
