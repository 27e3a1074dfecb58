//! Builder for test token claims
//!
//! Produces Azure AD shaped claim sets relative to the current time.

use crate::keys::decode_segment;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::{json, Map, Value};

/// Audience accepted by a host with no `AZURE_CLIENT_ID` configured.
pub const DEFAULT_TEST_AUDIENCE: &str = "https://management.azure.com/";

/// Issuer under the default trusted `https://sts.windows.net/` prefix.
pub const TEST_ISSUER: &str = "https://sts.windows.net/test-tenant/";

pub const TEST_SUBJECT: &str = "test-subject";

pub const TEST_OBJECT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Builder for JWT claim sets
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaims::valid()
///     .audience("api://my-app")
///     .expires_in(-60)
///     .to_json();
/// ```
#[derive(Debug, Clone)]
pub struct TestClaims {
    claims: Map<String, Value>,
}

impl TestClaims {
    /// Claims the default host configuration accepts: trusted issuer,
    /// default audience, issued now, valid for an hour.
    pub fn valid() -> Self {
        let now = Utc::now().timestamp();
        let claims = json!({
            "aud": DEFAULT_TEST_AUDIENCE,
            "iss": TEST_ISSUER,
            "iat": now,
            "nbf": now,
            "exp": now + 3600,
            "sub": TEST_SUBJECT,
            "oid": TEST_OBJECT_ID,
            "tid": "test-tenant",
            "name": "Test User",
        });

        match claims {
            Value::Object(claims) => Self { claims },
            _ => unreachable!("json! object literal"),
        }
    }

    /// Set any claim.
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Drop a claim entirely.
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    pub fn audience(self, audience: &str) -> Self {
        self.claim("aud", json!(audience))
    }

    pub fn issuer(self, issuer: &str) -> Self {
        self.claim("iss", json!(issuer))
    }

    pub fn subject(self, subject: &str) -> Self {
        self.claim("sub", json!(subject))
    }

    /// `exp` relative to now; negative for an already expired token.
    pub fn expires_in(self, seconds: i64) -> Self {
        self.claim("exp", json!(Utc::now().timestamp() + seconds))
    }

    /// `nbf` relative to now.
    pub fn not_before_offset(self, seconds: i64) -> Self {
        self.claim("nbf", json!(Utc::now().timestamp() + seconds))
    }

    /// `iat` relative to now; positive means issued in the future.
    pub fn issued_at_offset(self, seconds: i64) -> Self {
        self.claim("iat", json!(Utc::now().timestamp() + seconds))
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.claims.clone())
    }
}

/// Rewrite the payload of a signed token, keeping header and signature.
///
/// The result no longer matches its signature.
pub fn tamper_payload(token: &str, edit: impl FnOnce(&mut Value)) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "token should have three segments");

    let mut payload = decode_segment(parts[1]);
    edit(&mut payload);
    let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());

    format!("{}.{}.{}", parts[0], encoded, parts[2])
}
