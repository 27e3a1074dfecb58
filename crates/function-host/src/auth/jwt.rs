//! Signature and claim verification for a single token against a single key.
//!
//! # Security
//!
//! - Only RS256 is accepted; the header's `alg` must match.
//! - `exp` and `aud` are required. `nbf` is checked when present.
//! - No leeway on `exp`/`nbf`. `iat` may be at most the configured clock
//!   skew ahead of now.
//! - The specific failure is returned as an [`AuthFailure`] for logging; it
//!   never reaches HTTP callers.

use crate::auth::authorizer::AuthorizerSettings;
use crate::auth::claims::{TokenClaims, VerifiedPayload};
use crate::auth::jwks::SigningKey;
use crate::errors::AuthFailure;
use common::jwt::validate_iat;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Validation};

/// Verify `token` with `key` and return its claims.
///
/// # Errors
///
/// - `SignatureInvalid` - signature does not match the key
/// - `TokenExpired` / `TokenNotYetValid` - `exp` passed or `nbf` not reached
/// - `AudienceMismatch` - `aud` missing or not the configured audience
/// - `IssuedAtInvalid` - `iat` too far in the future
/// - `InternalFault` - the key material itself is unusable
/// - `MalformedToken` - anything else (wrong `alg`, bad encoding, bad claim types)
pub fn verify_token(
    token: &str,
    key: &SigningKey,
    settings: &AuthorizerSettings,
) -> Result<TokenClaims, AuthFailure> {
    let mut validation = Validation::new(key.algorithm());
    validation.set_audience(&[settings.audience.as_str()]);
    validation.set_required_spec_claims(&["exp", "aud"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<VerifiedPayload>(token, key.decoding_key(), &validation)
        .map_err(|e| {
            let failure = map_decode_error(e.kind());
            tracing::debug!(
                target: "fh.auth.jwt",
                kid = %key.kid(),
                kind = failure.kind(),
                error = %e,
                "Token verification failed"
            );
            failure
        })?;

    let claims = TokenClaims::from(token_data.claims);

    if let Some(iat) = claims.iat() {
        validate_iat(iat, settings.clock_skew).map_err(|e| {
            tracing::debug!(target: "fh.auth.jwt", iat, error = ?e, "Token iat validation failed");
            AuthFailure::IssuedAtInvalid
        })?;
    }

    Ok(claims)
}

fn map_decode_error(kind: &ErrorKind) -> AuthFailure {
    match kind {
        ErrorKind::InvalidSignature => AuthFailure::SignatureInvalid,
        ErrorKind::ExpiredSignature => AuthFailure::TokenExpired,
        ErrorKind::ImmatureSignature => AuthFailure::TokenNotYetValid,
        ErrorKind::InvalidAudience => AuthFailure::AudienceMismatch,
        ErrorKind::MissingRequiredClaim(claim) if claim == "aud" => AuthFailure::AudienceMismatch,
        ErrorKind::InvalidRsaKey(reason) => AuthFailure::InternalFault(reason.clone()),
        ErrorKind::InvalidKeyFormat => {
            AuthFailure::InternalFault("signing key has an invalid format".to_string())
        }
        ErrorKind::Crypto(e) => AuthFailure::InternalFault(e.to_string()),
        _ => AuthFailure::MalformedToken,
    }
}
