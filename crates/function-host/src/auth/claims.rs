//! Verified token claims.
//!
//! [`TokenClaims`] can only be produced inside this crate from a payload that
//! has passed signature and claim verification. It serializes back to a flat
//! JSON object (standard claims plus every other claim passed through), and
//! redacts `sub` in Debug output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The `aud` claim, which may be a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

/// Payload shape handed to `jsonwebtoken::decode`.
///
/// Kept private to the crate so that verified claims cannot be minted from
/// arbitrary JSON by callers.
#[derive(Deserialize)]
pub(crate) struct VerifiedPayload {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    #[serde(default)]
    nbf: Option<i64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Claims of a token that passed verification.
#[derive(Clone, Serialize)]
pub struct TokenClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    iss: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    aud: Option<Audience>,

    exp: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    nbf: Option<i64>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<VerifiedPayload> for TokenClaims {
    fn from(payload: VerifiedPayload) -> Self {
        Self {
            sub: payload.sub,
            iss: payload.iss,
            aud: payload.aud,
            exp: payload.exp,
            iat: payload.iat,
            nbf: payload.nbf,
            extra: payload.extra,
        }
    }
}

impl TokenClaims {
    pub fn sub(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    pub fn iss(&self) -> Option<&str> {
        self.iss.as_deref()
    }

    pub fn aud(&self) -> Option<&Audience> {
        self.aud.as_ref()
    }

    pub fn exp(&self) -> i64 {
        self.exp
    }

    pub fn iat(&self) -> Option<i64> {
        self.iat
    }

    pub fn nbf(&self) -> Option<i64> {
        self.nbf
    }

    /// Any non-standard claim, e.g. `oid`, `tid` or `appid`.
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.extra.get(claim)
    }
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("extra_claims", &self.extra.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims_from(json: Value) -> TokenClaims {
        let payload: VerifiedPayload = serde_json::from_value(json).unwrap();
        payload.into()
    }

    #[test]
    fn test_audience_single_and_multiple() {
        let single: Audience = serde_json::from_str(r#""api://fh""#).unwrap();
        assert!(single.contains("api://fh"));
        assert!(!single.contains("api://other"));

        let multiple: Audience = serde_json::from_str(r#"["a","api://fh"]"#).unwrap();
        assert!(multiple.contains("api://fh"));
        assert!(!multiple.contains("b"));
    }

    #[test]
    fn test_payload_passes_extra_claims_through() {
        let claims = claims_from(serde_json::json!({
            "sub": "principal-123",
            "iss": "https://sts.windows.net/tenant/",
            "aud": "https://management.azure.com/",
            "exp": 1_900_000_000,
            "iat": 1_899_996_400,
            "oid": "object-id",
            "tid": "tenant"
        }));

        assert_eq!(claims.sub(), Some("principal-123"));
        assert_eq!(claims.iss(), Some("https://sts.windows.net/tenant/"));
        assert_eq!(claims.exp(), 1_900_000_000);
        assert_eq!(claims.iat(), Some(1_899_996_400));
        assert_eq!(claims.nbf(), None);
        assert_eq!(claims.get("oid"), Some(&Value::from("object-id")));

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["tid"], "tenant");
        assert_eq!(json["aud"], "https://management.azure.com/");
        assert!(json.get("nbf").is_none());
    }

    #[test]
    fn test_payload_requires_exp() {
        let result: Result<VerifiedPayload, _> =
            serde_json::from_value(serde_json::json!({"sub": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_sub() {
        let claims = claims_from(serde_json::json!({
            "sub": "secret-principal",
            "exp": 1_900_000_000
        }));

        let debug = format!("{:?}", claims);
        assert!(!debug.contains("secret-principal"));
        assert!(debug.contains("[REDACTED]"));
    }
}
