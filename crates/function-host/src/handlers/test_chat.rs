//! Test chat endpoint.
//!
//! `POST /api/test-chat` echoes a canned reply so clients can exercise the
//! authenticated request path without a model backend. Outside development
//! mode the route sits behind `require_auth`.

use crate::auth::TokenClaims;
use crate::errors::HostError;
use crate::handlers::test_auth::DEV_PRINCIPAL_SUB;
use crate::models::{ChatRequest, ChatResponse};
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::{Extension, Json};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::instrument;

pub const CHAT_NOTE: &str = "This is a test endpoint. Real MCP tools are available via MCP protocol.";

#[instrument(skip_all, name = "fh.handlers.test_chat")]
pub async fn test_chat(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<TokenClaims>>,
    body: Bytes,
) -> Result<Json<ChatResponse>, HostError> {
    let request: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "fh.handlers.test_chat", error = %e, "Unparseable chat body");
        HostError::BadRequest(format!("Invalid request body: {e}"))
    })?;

    let message = request.message.ok_or_else(|| {
        HostError::BadRequest("Invalid request body: Missing message in request body".to_string())
    })?;

    let authenticated_user = if state.config.is_development() {
        DEV_PRINCIPAL_SUB.to_string()
    } else {
        claims
            .as_ref()
            .and_then(|Extension(claims)| claims.sub())
            .unwrap_or("production-user")
            .to_string()
    };

    let now = Utc::now();

    Ok(Json(ChatResponse {
        content: mock_reply(&message, now),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        authenticated_user,
        note: CHAT_NOTE.to_string(),
    }))
}

/// Canned reply: time and weather questions (English or Japanese) get fixed
/// answers, anything else is echoed.
pub fn mock_reply(message: &str, now: DateTime<Utc>) -> String {
    let lowered = message.to_lowercase();

    if lowered.contains("time") || lowered.contains("時刻") || lowered.contains("時間") {
        format!(
            "Current time: {} (Mock response for development)",
            now.format("%Y-%m-%d %H:%M:%S")
        )
    } else if lowered.contains("weather") || lowered.contains("天気") {
        "Weather: Sunny, 22°C in Tokyo (Mock response for development)".to_string()
    } else {
        format!(
            "I received your message: '{message}'. In production, this would be processed by MCP tools and Azure OpenAI."
        )
    }
}
