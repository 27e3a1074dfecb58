//! Token validation test endpoint.
//!
//! `GET|POST /api/test-auth` runs the full authorization pipeline against the
//! request's `Authorization` header and reports the decision. In development
//! mode authentication is skipped and a fixed principal is returned.

use crate::auth::AuthorizationResult;
use crate::errors::BEARER_CHALLENGE;
use crate::models::TestAuthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::{header::WWW_AUTHENTICATE, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::instrument;

pub const DEV_PRINCIPAL_SUB: &str = "dev-user";

#[instrument(skip_all, name = "fh.handlers.test_auth")]
pub async fn test_auth(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let is_dev = state.config.is_development();

    let (authenticated, principal) = if is_dev {
        tracing::debug!(target: "fh.handlers.test_auth", "Development mode, skipping authentication");
        (
            true,
            json!({
                "sub": DEV_PRINCIPAL_SUB,
                "note": "Development mode - authentication skipped"
            }),
        )
    } else {
        let AuthorizationResult {
            authorized,
            principal,
            error,
        } = state.authorizer.authorize(&headers).await;

        if let Some(error) = error {
            tracing::error!(target: "fh.handlers.test_auth", error = %error, "Authorization fault");
        }

        let principal = principal
            .and_then(|claims| serde_json::to_value(claims).ok())
            .unwrap_or_else(|| Value::Object(Default::default()));

        (authorized, principal)
    };

    let body = TestAuthResponse {
        authenticated,
        principal,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: if is_dev { "development" } else { "production" }.to_string(),
        message: if authenticated {
            "Authentication test successful"
        } else {
            "Authentication failed"
        }
        .to_string(),
    };

    if authenticated {
        (StatusCode::OK, Json(body)).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(WWW_AUTHENTICATE, HeaderValue::from_static(BEARER_CHALLENGE))],
            Json(body),
        )
            .into_response()
    }
}
