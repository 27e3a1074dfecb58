//! Token authorizer integration tests.
//!
//! Drives the authorizer against a mocked JWKS endpoint over real HTTP.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use fh_test_utils::{
    tamper_payload, MockJwksServer, TestClaims, TestSigningKey, PRIMARY_KID,
    TEST_ISSUER, TEST_SUBJECT,
};
use function_host::auth::jwks::{DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT};
use function_host::auth::{AuthorizerSettings, HttpKeySetSource, KeySetCache, TokenAuthorizer};
use function_host::errors::AuthFailure;
use std::sync::Arc;
use std::time::Duration;

fn authorizer_for(url: String, ttl: Duration) -> TokenAuthorizer {
    let source = Arc::new(HttpKeySetSource::new(url, DEFAULT_FETCH_TIMEOUT));
    let cache = Arc::new(KeySetCache::new(source, ttl));
    TokenAuthorizer::new(cache, AuthorizerSettings::default())
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    headers
}

/// A loopback URL nothing is listening on.
async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/discovery/v2.0/keys")
}

#[tokio::test]
async fn test_valid_token_is_authorized_with_principal() {
    let key = TestSigningKey::primary();
    let jwks = MockJwksServer::start(&[&key]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    let result = authorizer
        .authorize(&bearer(&key.sign(&TestClaims::valid().to_json())))
        .await;

    assert!(result.authorized);
    assert!(result.error.is_none());
    let principal = result.principal.expect("principal should be present");
    assert_eq!(principal.sub(), Some(TEST_SUBJECT));
    assert_eq!(principal.iss(), Some(TEST_ISSUER));
}

#[tokio::test]
async fn test_missing_or_non_bearer_header_is_rejected_without_fetch() {
    let jwks = MockJwksServer::start(&[&TestSigningKey::primary()]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    let mut basic = HeaderMap::new();
    basic.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));

    for headers in [HeaderMap::new(), basic] {
        let result = authorizer.authorize(&headers).await;
        assert!(!result.authorized);
        assert!(result.principal.is_none());
    }

    assert_eq!(jwks.fetch_count(), 0);
}

#[tokio::test]
async fn test_cached_key_serves_second_token_without_fetch() {
    let key = TestSigningKey::primary();
    let jwks = MockJwksServer::start(&[&key]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    let first = key.sign(&TestClaims::valid().to_json());
    let second = key.sign(&TestClaims::valid().subject("another-subject").to_json());

    assert!(authorizer.authorize(&bearer(&first)).await.authorized);
    assert!(authorizer.authorize(&bearer(&second)).await.authorized);

    assert_eq!(jwks.fetch_count(), 1);
}

#[tokio::test]
async fn test_expired_cache_refetches_once() {
    let key = TestSigningKey::primary();
    let jwks = MockJwksServer::start(&[&key]).await;
    let authorizer = authorizer_for(jwks.url(), Duration::from_millis(200));
    let token = key.sign(&TestClaims::valid().to_json());

    assert!(authorizer.authorize(&bearer(&token)).await.authorized);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(authorizer.authorize(&bearer(&token)).await.authorized);

    assert_eq!(jwks.fetch_count(), 2);
}

#[tokio::test]
async fn test_rotated_key_is_picked_up_on_unknown_kid() {
    let primary = TestSigningKey::primary();
    let secondary = TestSigningKey::secondary();
    let jwks = MockJwksServer::start(&[&primary]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    assert!(
        authorizer
            .authorize(&bearer(&primary.sign(&TestClaims::valid().to_json())))
            .await
            .authorized
    );

    jwks.publish(&[&primary, &secondary]);
    let rotated = secondary.sign(&TestClaims::valid().to_json());

    assert!(authorizer.authorize(&bearer(&rotated)).await.authorized);
    assert_eq!(jwks.fetch_count(), 2);
    assert_eq!(authorizer.key_set().key_count().await, 2);
}

#[tokio::test]
async fn test_kid_absent_after_refetch_is_key_not_found() {
    let jwks = MockJwksServer::start(&[&TestSigningKey::primary()]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    let token = TestSigningKey::secondary().sign(&TestClaims::valid().to_json());

    assert_eq!(
        authorizer.check_token(&bearer(&token)).await.unwrap_err(),
        AuthFailure::KeyNotFound
    );
}

#[tokio::test]
async fn test_tampered_payload_is_rejected() {
    let key = TestSigningKey::primary();
    let jwks = MockJwksServer::start(&[&key]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    let token = key.sign(&TestClaims::valid().to_json());
    let tampered = tamper_payload(&token, |claims| {
        claims["sub"] = serde_json::json!("admin");
    });

    let result = authorizer.authorize(&bearer(&tampered)).await;

    assert!(!result.authorized);
    assert!(result.principal.is_none());
    assert_eq!(
        authorizer.check_token(&bearer(&tampered)).await.unwrap_err(),
        AuthFailure::SignatureInvalid
    );
}

#[tokio::test]
async fn test_untrusted_issuer_is_rejected() {
    let key = TestSigningKey::primary();
    let jwks = MockJwksServer::start(&[&key]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    for issuer in ["https://evil.example.com/", "", "http://sts.windows.net/tenant/"] {
        let token = key.sign(&TestClaims::valid().issuer(issuer).to_json());
        assert_eq!(
            authorizer.check_token(&bearer(&token)).await.unwrap_err(),
            AuthFailure::IssuerRejected,
            "issuer {issuer:?} should be rejected"
        );
    }

    let v2 = key.sign(
        &TestClaims::valid()
            .issuer("https://login.microsoftonline.com/tenant/v2.0")
            .to_json(),
    );
    assert!(authorizer.authorize(&bearer(&v2)).await.authorized);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let key = TestSigningKey::primary();
    let jwks = MockJwksServer::start(&[&key]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    let token = key.sign(&TestClaims::valid().expires_in(-5).to_json());

    assert_eq!(
        authorizer.check_token(&bearer(&token)).await.unwrap_err(),
        AuthFailure::TokenExpired
    );
}

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let key = TestSigningKey::primary();
    let jwks = MockJwksServer::start(&[&key]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    let token = key.sign(&TestClaims::valid().audience("api://not-us").to_json());

    assert_eq!(
        authorizer.check_token(&bearer(&token)).await.unwrap_err(),
        AuthFailure::AudienceMismatch
    );
}

#[tokio::test]
async fn test_iat_far_in_future_is_rejected() {
    let key = TestSigningKey::primary();
    let jwks = MockJwksServer::start(&[&key]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    let token = key.sign(&TestClaims::valid().issued_at_offset(3600).to_json());

    assert_eq!(
        authorizer.check_token(&bearer(&token)).await.unwrap_err(),
        AuthFailure::IssuedAtInvalid
    );
}

#[tokio::test]
async fn test_hs256_token_is_rejected() {
    let jwks = MockJwksServer::start(&[&TestSigningKey::primary()]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    let token = fh_test_utils::sign_hs256(PRIMARY_KID, &TestClaims::valid().to_json());

    assert!(!authorizer.authorize(&bearer(&token)).await.authorized);
}

#[tokio::test]
async fn test_unreachable_key_endpoint_is_rejected_without_error() {
    let authorizer = authorizer_for(unreachable_url().await, DEFAULT_CACHE_TTL);
    let token = TestSigningKey::primary().sign(&TestClaims::valid().to_json());

    let result = authorizer.authorize(&bearer(&token)).await;

    assert!(!result.authorized);
    assert!(result.principal.is_none());
    assert!(result.error.is_none());
    assert_eq!(
        authorizer.check_token(&bearer(&token)).await.unwrap_err(),
        AuthFailure::KeySetFetchFailed
    );
}

#[tokio::test]
async fn test_outage_keeps_previous_key_set() {
    let key = TestSigningKey::primary();
    let jwks = MockJwksServer::start(&[&key]).await;
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    assert!(
        authorizer
            .authorize(&bearer(&key.sign(&TestClaims::valid().to_json())))
            .await
            .authorized
    );

    jwks.fail_with(503);
    let unknown = TestSigningKey::secondary().sign(&TestClaims::valid().to_json());
    assert_eq!(
        authorizer.check_token(&bearer(&unknown)).await.unwrap_err(),
        AuthFailure::KeySetFetchFailed
    );

    // The failed refetch did not discard the cached primary key
    let known = key.sign(&TestClaims::valid().to_json());
    assert!(authorizer.authorize(&bearer(&known)).await.authorized);
    assert_eq!(authorizer.key_set().key_count().await, 1);
}

#[tokio::test]
async fn test_malformed_key_set_document_is_fetch_failure() {
    let jwks = MockJwksServer::start(&[]).await;
    jwks.publish_raw(serde_json::json!({"not_keys": true}));
    let authorizer = authorizer_for(jwks.url(), DEFAULT_CACHE_TTL);

    let token = TestSigningKey::primary().sign(&TestClaims::valid().to_json());

    assert_eq!(
        authorizer.check_token(&bearer(&token)).await.unwrap_err(),
        AuthFailure::KeySetFetchFailed
    );
}

#[tokio::test]
async fn test_concurrent_misses_share_one_fetch() {
    let key = TestSigningKey::secondary();
    let jwks = MockJwksServer::start(&[&key]).await;
    let authorizer = Arc::new(authorizer_for(jwks.url(), DEFAULT_CACHE_TTL));
    let token = key.sign(&TestClaims::valid().to_json());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let authorizer = Arc::clone(&authorizer);
            let token = token.clone();
            tokio::spawn(async move { authorizer.authorize(&bearer(&token)).await.authorized })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap());
    }

    assert_eq!(jwks.fetch_count(), 1);
}
