//! Authentication middleware for protected routes.
//!
//! Runs the token authorizer on the request headers and injects the verified
//! [`TokenClaims`] into request extensions for handlers.

use crate::auth::{AuthorizationResult, TokenAuthorizer, TokenClaims};
use crate::errors::HostError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Client-facing message for every rejected token.
pub const UNAUTHORIZED_MESSAGE: &str = "The access token is invalid or expired";

/// Authentication middleware that validates bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Returns 401 Unauthorized with WWW-Authenticate header if the token is
///   missing or rejected for any reason, including key set outages
/// - Continues to next handler with claims in extensions if token is valid
#[instrument(skip_all, name = "fh.middleware.auth")]
pub async fn require_auth(
    State(authorizer): State<Arc<TokenAuthorizer>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HostError> {
    let AuthorizationResult {
        authorized,
        principal,
        error,
    } = authorizer.authorize(req.headers()).await;

    let claims = match principal {
        Some(claims) if authorized => claims,
        _ => {
            if let Some(error) = error {
                tracing::error!(target: "fh.middleware.auth", error = %error, "Authorization fault");
            } else {
                tracing::debug!(target: "fh.middleware.auth", "Request not authorized");
            }
            return Err(HostError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()));
        }
    };

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
