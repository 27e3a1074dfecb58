//! Function host error types.
//!
//! Two families live here:
//!
//! - [`AuthFailure`] - why a bearer token was rejected. Used for logs and
//!   metrics only; callers of the authorizer never see the variant.
//! - [`HostError`] - HTTP-facing errors. Map to status codes via the
//!   `IntoResponse` impl with deliberately generic client messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Reason a token failed the authorization pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("no bearer token in Authorization header")]
    MissingBearerToken,

    #[error("token header has no key identifier")]
    MissingKeyId,

    #[error("key identifier not present in the signing key set")]
    KeyNotFound,

    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    TokenExpired,

    #[error("token is not valid yet")]
    TokenNotYetValid,

    #[error("token audience does not match")]
    AudienceMismatch,

    #[error("token issued-at is in the future")]
    IssuedAtInvalid,

    #[error("token is malformed")]
    MalformedToken,

    #[error("token issuer is not trusted")]
    IssuerRejected,

    #[error("signing key set could not be fetched")]
    KeySetFetchFailed,

    #[error("internal fault: {0}")]
    InternalFault(String),
}

impl AuthFailure {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthFailure::MissingBearerToken => "MissingBearerToken",
            AuthFailure::MissingKeyId => "MissingKeyId",
            AuthFailure::KeyNotFound => "KeyNotFound",
            AuthFailure::SignatureInvalid => "SignatureInvalid",
            AuthFailure::TokenExpired => "TokenExpired",
            AuthFailure::TokenNotYetValid => "TokenNotYetValid",
            AuthFailure::AudienceMismatch => "AudienceMismatch",
            AuthFailure::IssuedAtInvalid => "IssuedAtInvalid",
            AuthFailure::MalformedToken => "MalformedToken",
            AuthFailure::IssuerRejected => "IssuerRejected",
            AuthFailure::KeySetFetchFailed => "KeySetFetchFailed",
            AuthFailure::InternalFault(_) => "InternalFault",
        }
    }
}

/// HTTP-facing error type.
///
/// Maps to status codes:
/// - Unauthorized: 401 (with `WWW-Authenticate`)
/// - BadRequest: 400
/// - NotFound: 404
/// - Internal: 500
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// `WWW-Authenticate` challenge attached to every 401.
pub const BEARER_CHALLENGE: &str = "Bearer realm=\"function-host\", error=\"invalid_token\"";

impl IntoResponse for HostError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            HostError::Unauthorized(reason) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", reason.clone())
            }
            HostError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            HostError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            HostError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(value) = BEARER_CHALLENGE.parse() {
                response.headers_mut().insert("WWW-Authenticate", value);
            }
        }

        response
    }
}
