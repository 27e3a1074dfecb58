//! Signing key set cache for the identity platform's JWKS endpoint.
//!
//! The whole key set shares one expiry: it is either fresh or stale, never
//! partially stale. A lookup that misses (unknown `kid`, or a stale or empty
//! set) refetches the entire set exactly once before answering.
//!
//! # Concurrency
//!
//! - The mapping and its expiry live in one `Option<CachedKeySet>` behind an
//!   async `RwLock` and are replaced with a single write, so readers see
//!   either the old set or the new one.
//! - Refreshes are single-flight. Every fetch attempt, successful or not,
//!   bumps `attempts` and records its outcome under `refresh_lock`. A caller
//!   that queued behind an attempt which finished while it waited takes that
//!   outcome (the new set, or the same failure) instead of fetching again.
//! - A failed fetch leaves the previous set in place.

use crate::observability::metrics::{record_jwks_cache, record_jwks_fetch};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::instrument;

/// Microsoft identity platform key discovery document.
pub const DEFAULT_JWKS_URL: &str = "https://login.microsoftonline.com/common/discovery/v2.0/keys";

/// How long a fetched key set stays authoritative.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Upper bound on a single JWKS request, connect through body.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// One entry of a JWKS document.
///
/// Only the fields needed to rebuild an RSA verification key are kept;
/// anything else the endpoint publishes (`x5t`, `x5c`, `issuer`) is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kty: String,

    #[serde(default)]
    pub kid: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    #[serde(default)]
    pub alg: Option<String>,

    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document: `{"keys": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// Why a JWK entry could not become a [`SigningKey`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JwkError {
    #[error("JWK has no kid")]
    MissingKid,

    #[error("unsupported key type {0}")]
    UnsupportedKeyType(String),

    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("key use {0} is not sig")]
    NotSigningKey(String),

    #[error("missing RSA component {0}")]
    MissingComponent(&'static str),

    #[error("invalid RSA components: {0}")]
    InvalidComponents(String),
}

/// A verification-only RS256 public key.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// The only algorithm tokens are accepted with.
    pub const ALGORITHM: Algorithm = Algorithm::RS256;

    /// Build a key from a JWKS entry.
    ///
    /// # Errors
    ///
    /// Returns a [`JwkError`] for non-RSA, non-RS256 or non-signing entries,
    /// and for entries whose `n`/`e` components are missing or undecodable.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, JwkError> {
        let kid = jwk
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(JwkError::MissingKid)?;

        if jwk.kty != "RSA" {
            return Err(JwkError::UnsupportedKeyType(jwk.kty.clone()));
        }
        if let Some(alg) = jwk.alg.as_deref().filter(|alg| *alg != "RS256") {
            return Err(JwkError::UnsupportedAlgorithm(alg.to_string()));
        }
        if let Some(key_use) = jwk.key_use.as_deref().filter(|u| *u != "sig") {
            return Err(JwkError::NotSigningKey(key_use.to_string()));
        }

        let n = jwk.n.as_deref().ok_or(JwkError::MissingComponent("n"))?;
        let e = jwk.e.as_deref().ok_or(JwkError::MissingComponent("e"))?;
        let decoding_key = DecodingKey::from_rsa_components(n, e)
            .map_err(|err| JwkError::InvalidComponents(err.to_string()))?;

        Ok(Self {
            kid: kid.to_string(),
            decoding_key,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        Self::ALGORITHM
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &Self::ALGORITHM)
            .finish_non_exhaustive()
    }
}

/// Failure to obtain a key set document.
#[derive(Debug, Clone, Error)]
pub enum KeySetFetchError {
    #[error("JWKS request failed: {0}")]
    Transport(String),

    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    #[error("JWKS response could not be parsed: {0}")]
    Parse(String),
}

/// Where key set documents come from.
#[async_trait]
pub trait KeySetSource: Send + Sync {
    /// Fetch the current key set document.
    async fn fetch(&self) -> Result<JwksResponse, KeySetFetchError>;

    /// Human-readable location, for logs.
    fn location(&self) -> &str;
}

/// [`KeySetSource`] that GETs a JWKS URL with a bounded timeout.
pub struct HttpKeySetSource {
    url: String,
    http_client: reqwest::Client,
}

impl HttpKeySetSource {
    pub fn new(url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "fh.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { url, http_client }
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwksResponse, KeySetFetchError> {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| KeySetFetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeySetFetchError::Status(status.as_u16()));
        }

        response
            .json::<JwksResponse>()
            .await
            .map_err(|e| KeySetFetchError::Parse(e.to_string()))
    }

    fn location(&self) -> &str {
        &self.url
    }
}

/// One fetched key set and when it stops being authoritative.
struct CachedKeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    expires_at: Instant,
}

/// Process-wide signing key cache.
pub struct KeySetCache {
    source: Arc<dyn KeySetSource>,
    cache: RwLock<Option<CachedKeySet>>,
    /// Failure of the most recent fetch attempt, `None` if it succeeded.
    refresh_lock: Mutex<Option<KeySetFetchError>>,
    /// Completed fetch attempts. Only written while `refresh_lock` is held.
    attempts: AtomicU64,
    ttl: Duration,
}

impl KeySetCache {
    /// Create an empty cache. Nothing is fetched until the first lookup.
    pub fn new(source: Arc<dyn KeySetSource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(None),
            attempts: AtomicU64::new(0),
            ttl,
        }
    }

    /// Look up the key for `kid`, refetching the set on a miss.
    ///
    /// Fetch failures are logged by the refresh path and reported as absent.
    pub async fn get_signing_key(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.try_get_signing_key(kid).await.ok().flatten()
    }

    /// Same as [`get_signing_key`](Self::get_signing_key) but surfaces fetch
    /// failures.
    ///
    /// # Errors
    ///
    /// Returns `KeySetFetchError` when a refetch was needed and failed.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn try_get_signing_key(
        &self,
        kid: &str,
    ) -> Result<Option<Arc<SigningKey>>, KeySetFetchError> {
        let observed_attempt = self.attempts.load(Ordering::Acquire);
        {
            let cache = self.cache.read().await;
            match cache.as_ref() {
                Some(cached) if cached.expires_at > Instant::now() => {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "fh.auth.jwks", "JWKS cache hit");
                        record_jwks_cache("hit");
                        return Ok(Some(Arc::clone(key)));
                    }
                    tracing::debug!(target: "fh.auth.jwks", "Key not in cached set, refetching");
                    record_jwks_cache("unknown_kid");
                }
                Some(_) => {
                    tracing::debug!(target: "fh.auth.jwks", "Cached key set expired");
                    record_jwks_cache("expired");
                }
                None => record_jwks_cache("empty"),
            }
        }

        self.refresh_unless_attempted(observed_attempt).await?;

        let cache = self.cache.read().await;
        let key = cache
            .as_ref()
            .and_then(|cached| cached.keys.get(kid))
            .map(Arc::clone);

        if key.is_none() {
            tracing::warn!(target: "fh.auth.jwks", "Key not found in JWKS after refresh");
        }

        Ok(key)
    }

    /// Refetch unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `KeySetFetchError` if the fetch fails; the cache is unchanged.
    pub async fn force_refresh(&self) -> Result<(), KeySetFetchError> {
        let mut last_failure = self.refresh_lock.lock().await;
        self.refresh_locked(&mut last_failure).await
    }

    /// Number of keys in the current set (stale or not).
    pub async fn key_count(&self) -> usize {
        self.cache
            .read()
            .await
            .as_ref()
            .map_or(0, |cached| cached.keys.len())
    }

    /// Time left before the current set goes stale, if it is still fresh.
    pub async fn expires_in(&self) -> Option<Duration> {
        self.cache
            .read()
            .await
            .as_ref()
            .and_then(|cached| cached.expires_at.checked_duration_since(Instant::now()))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Fetch unless an attempt completed after `observed_attempt` was read,
    /// in which case that attempt's outcome is returned.
    async fn refresh_unless_attempted(&self, observed_attempt: u64) -> Result<(), KeySetFetchError> {
        let mut last_failure = self.refresh_lock.lock().await;

        if self.attempts.load(Ordering::Acquire) != observed_attempt {
            record_jwks_cache("coalesced");
            return match last_failure.as_ref() {
                None => {
                    tracing::debug!(target: "fh.auth.jwks", "Key set refreshed by a concurrent caller");
                    Ok(())
                }
                Some(e) => {
                    tracing::debug!(
                        target: "fh.auth.jwks",
                        error = %e,
                        "Concurrent JWKS fetch failed, not retrying"
                    );
                    Err(e.clone())
                }
            };
        }

        self.refresh_locked(&mut last_failure).await
    }

    /// Run one fetch attempt and publish its outcome. `last_failure` is the
    /// guarded state of `refresh_lock`.
    async fn refresh_locked(
        &self,
        last_failure: &mut Option<KeySetFetchError>,
    ) -> Result<(), KeySetFetchError> {
        let outcome = self.fetch_and_swap().await;
        *last_failure = outcome.as_ref().err().cloned();
        self.attempts.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    #[instrument(skip(self), fields(source = %self.source.location()))]
    async fn fetch_and_swap(&self) -> Result<(), KeySetFetchError> {
        tracing::debug!(target: "fh.auth.jwks", "Fetching JWKS");
        let started = std::time::Instant::now();

        let document = match self.source.fetch().await {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(
                    target: "fh.auth.jwks",
                    kind = "KeySetFetchFailed",
                    error = %e,
                    "Failed to fetch JWKS"
                );
                record_jwks_fetch("error", started.elapsed());
                return Err(e);
            }
        };

        let mut keys = HashMap::with_capacity(document.keys.len());
        for jwk in &document.keys {
            match SigningKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(key.kid().to_string(), Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(
                        target: "fh.auth.jwks",
                        kid = ?jwk.kid,
                        error = %e,
                        "Skipping unusable JWK"
                    );
                }
            }
        }

        record_jwks_fetch("success", started.elapsed());
        tracing::info!(
            target: "fh.auth.jwks",
            key_count = keys.len(),
            skipped = document.keys.len() - keys.len(),
            "JWKS cache refreshed"
        );

        *self.cache.write().await = Some(CachedKeySet {
            keys,
            expires_at: Instant::now() + self.ttl,
        });

        Ok(())
    }
}
