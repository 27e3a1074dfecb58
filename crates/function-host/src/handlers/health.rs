//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use crate::services::Tool;
use axum::extract::State;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::instrument;

pub const SERVICE_NAME: &str = "MCP Functions Server";

/// Health check handler.
///
/// Always healthy while the process serves requests. Does not touch the
/// signing key set, so an identity platform outage does not fail the health check.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "timestamp": "2025-01-01T00:00:00.000Z",
///   "service": "MCP Functions Server",
///   "environment": "production",
///   "mcp_tools": ["hello_mcp", "get_snippet", "save_snippet", "get_current_time", "get_weather_info"]
/// }
/// ```
#[instrument(skip_all, name = "fh.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        service: SERVICE_NAME.to_string(),
        environment: state.config.environment_name().to_string(),
        mcp_tools: Tool::ALL.iter().map(|tool| tool.name().to_string()).collect(),
    })
}
