//! HTTP routes for the function host.
//!
//! Defines the Axum router and application state.

use crate::auth::TokenAuthorizer;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth};
use crate::services::SnippetStore;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Host configuration.
    pub config: Config,

    /// Bearer token authorizer shared with the auth middleware.
    pub authorizer: Arc<TokenAuthorizer>,

    /// Backing store for the snippet tools.
    pub snippets: Arc<dyn SnippetStore>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/api/health` - Health check (public)
/// - `/api/test-auth` - Token validation report, GET or POST (public, validates itself)
/// - `/api/test-chat` - Mock chat reply (authenticated outside development)
/// - `/api/tools/:tool_name` - Tool invocation (authenticated outside development)
/// - `/metrics` - Prometheus scrape endpoint (public)
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route(
            "/api/test-auth",
            get(handlers::test_auth).post(handlers::test_auth),
        )
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let mut protected_routes = Router::new()
        .route("/api/test-chat", post(handlers::test_chat))
        .route("/api/tools/:tool_name", post(handlers::invoke_tool));

    if state.config.is_development() {
        tracing::warn!(
            target: "fh.routes",
            "Development mode: authentication disabled on chat and tool routes"
        );
    } else {
        protected_routes = protected_routes.route_layer(middleware::from_fn_with_state(
            state.authorizer.clone(),
            require_auth,
        ));
    }

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes.with_state(state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
