//! JWT helpers for the function host.
//!
//! Covers the parts of bearer-token handling that happen before or around
//! signature verification:
//! - Size limit applied before any parsing
//! - Key ID extraction from the unverified header
//! - `iat` sanity checking with a bounded clock skew
//!
//! # Security
//!
//! - Nothing in this module verifies a signature. A `kid` read here is only a
//!   lookup hint into a trusted key set; the token must still be verified.
//! - Error messages are generic. Details are logged at debug level.

use jsonwebtoken::decode_header;
use std::time::Duration;
use thiserror::Error;

/// Maximum accepted bearer token size in bytes (8KB).
///
/// Identity-platform access tokens are typically 1-2KB. Anything larger is
/// rejected before base64 decoding or JSON parsing takes place.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default clock skew tolerance for `iat` checks (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Upper bound for a configured clock skew (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Errors raised while inspecting a token prior to verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Not three segments, bad base64, or an unparseable header.
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Header has no usable `kid`.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// `iat` lies further in the future than the allowed skew.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

/// Read the `kid` from a JWT header without verifying the token.
///
/// # Errors
///
/// - `TokenTooLarge` if the token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` if the token is not `header.payload.signature` or the
///   header does not decode to a JOSE header
/// - `MissingKid` if the header carries no `kid`, or an empty one
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let segments = token.split('.').count();
    if segments != 3 || token.split('.').any(str::is_empty) {
        tracing::debug!(
            target: "common.jwt",
            segments,
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header = decode_header(token).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header");
        JwtValidationError::MalformedToken
    })?;

    header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(JwtValidationError::MissingKid)
}

/// Reject tokens whose `iat` is more than `clock_skew` ahead of now.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` when the check fails.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    validate_iat_at(iat, clock_skew, chrono::Utc::now().timestamp())
}

/// [`validate_iat`] against an explicit `now`, for deterministic tests.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    let skew_secs = i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX);
    let max_iat = now.saturating_add(skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat,
            now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}
