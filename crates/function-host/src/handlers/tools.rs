//! Tool invocation endpoint.
//!
//! `POST /api/tools/{tool_name}` with `{"arguments": {...}}` runs the named
//! tool and returns `{"tool": ..., "result": "<text>"}`. An empty body means
//! no arguments.

use crate::errors::HostError;
use crate::models::{ToolRequest, ToolResponse};
use crate::routes::AppState;
use crate::services::tools::{self, Tool};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

#[instrument(skip_all, name = "fh.handlers.tools")]
pub async fn invoke_tool(
    State(state): State<Arc<AppState>>,
    Path(tool_name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolResponse>, HostError> {
    let tool = Tool::from_name(&tool_name).ok_or_else(|| {
        tracing::debug!(target: "fh.handlers.tools", tool = %tool_name, "Unknown tool requested");
        HostError::NotFound(format!("Tool '{tool_name}' not found"))
    })?;

    let request = if body.is_empty() {
        ToolRequest::default()
    } else {
        serde_json::from_slice::<ToolRequest>(&body).map_err(|e| {
            tracing::debug!(target: "fh.handlers.tools", error = %e, "Unparseable tool body");
            HostError::BadRequest(format!("Invalid request body: {e}"))
        })?
    };

    let result = tools::invoke(tool, &request.arguments, state.snippets.as_ref()).await;

    Ok(Json(ToolResponse {
        tool: tool.name().to_string(),
        result,
    }))
}
