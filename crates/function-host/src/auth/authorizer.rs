//! Bearer token authorizer.
//!
//! Runs the per-request pipeline:
//!
//! ```text
//! Authorization header -> bearer token -> kid -> signing key (cache)
//!     -> RS256 + claim verification -> issuer allow-list -> decision
//! ```
//!
//! Every failure collapses to "not authorized" for callers. The specific
//! [`AuthFailure`] is logged and counted where it is detected. No state is
//! carried between calls apart from the shared [`KeySetCache`].

use crate::auth::claims::TokenClaims;
use crate::auth::jwks::KeySetCache;
use crate::auth::jwt::verify_token;
use crate::errors::AuthFailure;
use crate::observability::metrics::record_token_validation;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use common::jwt::{extract_kid, JwtValidationError, DEFAULT_CLOCK_SKEW};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Default expected audience when no client ID is configured.
pub const DEFAULT_AUDIENCE: &str = "https://management.azure.com/";

/// Issuers accepted by default: Azure AD v1 and v2 endpoints.
pub const DEFAULT_TRUSTED_ISSUER_PREFIXES: [&str; 2] = [
    "https://sts.windows.net/",
    "https://login.microsoftonline.com/",
];

/// Claim policy applied after signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizerSettings {
    /// Required `aud` value.
    pub audience: String,

    /// `iss` must start with one of these.
    pub trusted_issuer_prefixes: Vec<String>,

    /// How far in the future `iat` may be.
    pub clock_skew: Duration,
}

impl Default for AuthorizerSettings {
    fn default() -> Self {
        Self {
            audience: DEFAULT_AUDIENCE.to_string(),
            trusted_issuer_prefixes: DEFAULT_TRUSTED_ISSUER_PREFIXES
                .iter()
                .map(|prefix| (*prefix).to_string())
                .collect(),
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }
}

impl AuthorizerSettings {
    fn issuer_is_trusted(&self, issuer: Option<&str>) -> bool {
        issuer.filter(|iss| !iss.is_empty()).is_some_and(|iss| {
            self.trusted_issuer_prefixes
                .iter()
                .any(|prefix| iss.starts_with(prefix.as_str()))
        })
    }
}

/// Outcome of [`TokenAuthorizer::authorize`].
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResult {
    pub authorized: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<TokenClaims>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthorizationResult {
    fn granted(principal: TokenClaims) -> Self {
        Self {
            authorized: true,
            principal: Some(principal),
            error: None,
        }
    }

    fn denied() -> Self {
        Self {
            authorized: false,
            principal: None,
            error: None,
        }
    }

    fn faulted(error: String) -> Self {
        Self {
            authorized: false,
            principal: None,
            error: Some(error),
        }
    }
}

/// Validates bearer tokens issued by the Microsoft identity platform.
pub struct TokenAuthorizer {
    key_set: Arc<KeySetCache>,
    settings: AuthorizerSettings,
}

impl TokenAuthorizer {
    pub fn new(key_set: Arc<KeySetCache>, settings: AuthorizerSettings) -> Self {
        Self { key_set, settings }
    }

    pub fn key_set(&self) -> &Arc<KeySetCache> {
        &self.key_set
    }

    /// Make the authorization decision for a request.
    ///
    /// Never fails: a panic inside the pipeline is caught and reported as
    /// `{authorized: false, error}` like any other internal fault.
    pub async fn authorize(&self, headers: &HeaderMap) -> AuthorizationResult {
        match AssertUnwindSafe(self.check_token(headers))
            .catch_unwind()
            .await
        {
            Ok(Ok(claims)) => AuthorizationResult::granted(claims),
            Ok(Err(AuthFailure::InternalFault(message))) => {
                AuthorizationResult::faulted(message)
            }
            Ok(Err(_)) => AuthorizationResult::denied(),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "token validation panicked".to_string());
                tracing::error!(
                    target: "fh.auth.authorizer",
                    kind = "InternalFault",
                    error = %message,
                    "Panic during token validation"
                );
                record_token_validation("InternalFault");
                AuthorizationResult::faulted(message)
            }
        }
    }

    /// The validated principal, or `None` on any failure.
    pub async fn validate_token(&self, headers: &HeaderMap) -> Option<TokenClaims> {
        self.check_token(headers).await.ok()
    }

    /// Run the pipeline and report why a token was rejected.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthFailure`] for the first failing stage.
    #[instrument(skip_all, name = "fh.auth.check_token")]
    pub async fn check_token(&self, headers: &HeaderMap) -> Result<TokenClaims, AuthFailure> {
        let result = self.run_pipeline(headers).await;

        match &result {
            Ok(claims) => {
                tracing::info!(
                    target: "fh.auth.authorizer",
                    subject = claims.sub().unwrap_or("<none>"),
                    "Token validated"
                );
                record_token_validation("success");
            }
            Err(failure) => {
                log_failure(failure);
                record_token_validation(failure.kind());
            }
        }

        result
    }

    async fn run_pipeline(&self, headers: &HeaderMap) -> Result<TokenClaims, AuthFailure> {
        let token = extract_bearer_token(headers)?;

        let kid = extract_kid(token).map_err(|e| match e {
            JwtValidationError::MissingKid => AuthFailure::MissingKeyId,
            _ => AuthFailure::MalformedToken,
        })?;

        let key = self
            .key_set
            .try_get_signing_key(&kid)
            .await
            .map_err(|_| AuthFailure::KeySetFetchFailed)?
            .ok_or(AuthFailure::KeyNotFound)?;

        let claims = verify_token(token, &key, &self.settings)?;

        if !self.settings.issuer_is_trusted(claims.iss()) {
            tracing::debug!(
                target: "fh.auth.authorizer",
                issuer = claims.iss().unwrap_or("<none>"),
                "Issuer not in allow-list"
            );
            return Err(AuthFailure::IssuerRejected);
        }

        Ok(claims)
    }
}

/// Token from an `Authorization: Bearer <token>` header.
///
/// # Errors
///
/// `MissingBearerToken` if the header is absent, not ASCII, not a Bearer
/// credential, or carries an empty token. Everything after `Bearer ` is the
/// token as sent; surrounding whitespace is not stripped.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or(AuthFailure::MissingBearerToken)
}

fn log_failure(failure: &AuthFailure) {
    match failure {
        AuthFailure::MissingBearerToken => {
            tracing::debug!(
                target: "fh.auth.authorizer",
                kind = failure.kind(),
                "No bearer token on request"
            );
        }
        AuthFailure::KeySetFetchFailed | AuthFailure::InternalFault(_) => {
            tracing::error!(
                target: "fh.auth.authorizer",
                kind = failure.kind(),
                error = %failure,
                "Token validation error"
            );
        }
        _ => {
            tracing::warn!(
                target: "fh.auth.authorizer",
                kind = failure.kind(),
                error = %failure,
                "Token rejected"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::jwks::{JwksResponse, KeySetFetchError, KeySetSource, DEFAULT_CACHE_TTL};
    use async_trait::async_trait;
    use axum::http::HeaderValue;

    struct UnreachableSource;

    #[async_trait]
    impl KeySetSource for UnreachableSource {
        async fn fetch(&self) -> Result<JwksResponse, KeySetFetchError> {
            Err(KeySetFetchError::Transport("connection refused".to_string()))
        }

        fn location(&self) -> &str {
            "memory://unreachable"
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl KeySetSource for PanickingSource {
        async fn fetch(&self) -> Result<JwksResponse, KeySetFetchError> {
            panic!("key source exploded");
        }

        fn location(&self) -> &str {
            "memory://panicking"
        }
    }

    fn authorizer_over(source: impl KeySetSource + 'static) -> TokenAuthorizer {
        let cache = Arc::new(KeySetCache::new(Arc::new(source), DEFAULT_CACHE_TTL));
        TokenAuthorizer::new(cache, AuthorizerSettings::default())
    }

    fn headers_with(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    fn token_with_kid(kid: &str) -> String {
        fh_test_utils::TestSigningKey::primary()
            .with_kid(kid)
            .sign(&fh_test_utils::TestClaims::valid().to_json())
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&headers_with("Bearer abc")), Ok("abc"));
        assert_eq!(
            extract_bearer_token(&HeaderMap::new()),
            Err(AuthFailure::MissingBearerToken)
        );
        assert_eq!(
            extract_bearer_token(&headers_with("Basic abc123")),
            Err(AuthFailure::MissingBearerToken)
        );
        assert_eq!(
            extract_bearer_token(&headers_with("bearer abc")),
            Err(AuthFailure::MissingBearerToken)
        );
        assert_eq!(
            extract_bearer_token(&headers_with("Bearer ")),
            Err(AuthFailure::MissingBearerToken)
        );
    }

    #[test]
    fn test_extract_bearer_token_keeps_padding() {
        assert_eq!(
            extract_bearer_token(&headers_with("Bearer  abc ")),
            Ok(" abc ")
        );
    }

    #[tokio::test]
    async fn test_padded_token_is_malformed() {
        let authorizer = authorizer_over(UnreachableSource);
        let headers = headers_with(&format!("Bearer  {}", token_with_kid("k1")));

        assert_eq!(
            authorizer.check_token(&headers).await.unwrap_err(),
            AuthFailure::MalformedToken
        );
        assert!(!authorizer.authorize(&headers).await.authorized);
    }

    #[test]
    fn test_default_settings() {
        let settings = AuthorizerSettings::default();
        assert_eq!(settings.audience, "https://management.azure.com/");
        assert_eq!(settings.clock_skew, Duration::from_secs(300));
        assert_eq!(settings.trusted_issuer_prefixes.len(), 2);
    }

    #[test]
    fn test_issuer_allow_list() {
        let settings = AuthorizerSettings::default();
        assert!(settings.issuer_is_trusted(Some("https://sts.windows.net/tenant/")));
        assert!(settings.issuer_is_trusted(Some("https://login.microsoftonline.com/tenant/v2.0")));
        assert!(!settings.issuer_is_trusted(Some("https://evil.example.com/")));
        assert!(!settings.issuer_is_trusted(Some("")));
        assert!(!settings.issuer_is_trusted(None));
    }

    #[tokio::test]
    async fn test_missing_header_is_denied_without_error() {
        let authorizer = authorizer_over(UnreachableSource);

        let result = authorizer.authorize(&HeaderMap::new()).await;

        assert!(!result.authorized);
        assert!(result.principal.is_none());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_missing_kid_is_reported() {
        let authorizer = authorizer_over(UnreachableSource);
        let token = fh_test_utils::sign_without_kid(&fh_test_utils::TestClaims::valid().to_json());

        let failure = authorizer
            .check_token(&headers_with(&format!("Bearer {token}")))
            .await
            .unwrap_err();

        assert_eq!(failure, AuthFailure::MissingKeyId);
    }

    #[tokio::test]
    async fn test_garbage_token_is_malformed() {
        let authorizer = authorizer_over(UnreachableSource);

        let failure = authorizer
            .check_token(&headers_with("Bearer not-a-jwt"))
            .await
            .unwrap_err();

        assert_eq!(failure, AuthFailure::MalformedToken);
    }

    #[tokio::test]
    async fn test_unreachable_key_set_is_fetch_failure() {
        let authorizer = authorizer_over(UnreachableSource);
        let headers = headers_with(&format!("Bearer {}", token_with_kid("k1")));

        assert_eq!(
            authorizer.check_token(&headers).await.unwrap_err(),
            AuthFailure::KeySetFetchFailed
        );

        let result = authorizer.authorize(&headers).await;
        assert!(!result.authorized);
        assert!(result.error.is_none());
        assert!(authorizer.validate_token(&headers).await.is_none());
    }

    #[tokio::test]
    async fn test_panic_in_pipeline_becomes_fault() {
        let authorizer = authorizer_over(PanickingSource);
        let headers = headers_with(&format!("Bearer {}", token_with_kid("k1")));

        let result = authorizer.authorize(&headers).await;

        assert!(!result.authorized);
        assert_eq!(result.error.as_deref(), Some("key source exploded"));
    }

    #[test]
    fn test_authorization_result_serialization() {
        let denied = serde_json::to_value(AuthorizationResult::denied()).unwrap();
        assert_eq!(denied, serde_json::json!({"authorized": false}));

        let faulted =
            serde_json::to_value(AuthorizationResult::faulted("boom".to_string())).unwrap();
        assert_eq!(
            faulted,
            serde_json::json!({"authorized": false, "error": "boom"})
        );
    }
}
