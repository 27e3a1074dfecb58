//! Function host models.
//!
//! Request and response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Health check response.
///
/// Returned by the `/api/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy" when the process is serving.
    pub status: String,

    /// RFC 3339 time of the check.
    pub timestamp: String,

    pub service: String,

    /// `AZURE_FUNCTIONS_ENVIRONMENT`, or "production" when unset.
    pub environment: String,

    /// Names of the tools served under `/api/tools`.
    pub mcp_tools: Vec<String>,
}

/// Response of `/api/test-auth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAuthResponse {
    pub authenticated: bool,

    /// Verified claims, or `{}` when not authenticated.
    pub principal: Value,

    pub timestamp: String,

    /// "development" or "production".
    pub environment: String,

    pub message: String,
}

/// Request body of `/api/test-chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `/api/test-chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub timestamp: String,
    pub authenticated_user: String,
    pub note: String,
}

/// Request body of `/api/tools/{tool_name}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolRequest {
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Response of `/api/tools/{tool_name}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    pub tool: String,
    pub result: String,
}
