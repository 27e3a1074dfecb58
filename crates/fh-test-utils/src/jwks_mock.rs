//! JWKS endpoint mock
//!
//! Wraps a wiremock server whose key set can be swapped mid-test, so key
//! rotation and identity platform outages can be simulated against a
//! running host.

use crate::keys::TestSigningKey;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Path the mock serves the key set on.
pub const JWKS_PATH: &str = "/discovery/v2.0/keys";

#[derive(Debug, Clone)]
enum Published {
    Keys(Value),
    Failure(u16),
}

#[derive(Clone)]
struct SwappableJwks {
    published: Arc<Mutex<Published>>,
    hits: Arc<AtomicUsize>,
}

impl Respond for SwappableJwks {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.hits.fetch_add(1, Ordering::SeqCst);
        match &*self.published.lock().unwrap() {
            Published::Keys(body) => ResponseTemplate::new(200).set_body_json(body),
            Published::Failure(status) => ResponseTemplate::new(*status),
        }
    }
}

/// Mock identity platform key endpoint.
///
/// # Example
/// ```rust,ignore
/// let jwks = MockJwksServer::start(&[&TestSigningKey::primary()]).await;
/// // ... host fetches keys from jwks.url() ...
/// jwks.publish(&[&TestSigningKey::secondary()]);
/// assert_eq!(jwks.fetch_count(), 1);
/// ```
pub struct MockJwksServer {
    server: MockServer,
    responder: SwappableJwks,
}

impl MockJwksServer {
    /// Start serving a key set containing `keys`.
    pub async fn start(keys: &[&TestSigningKey]) -> Self {
        let server = MockServer::start().await;
        let responder = SwappableJwks {
            published: Arc::new(Mutex::new(Published::Keys(key_set(keys)))),
            hits: Arc::new(AtomicUsize::new(0)),
        };

        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(responder.clone())
            .mount(&server)
            .await;

        Self { server, responder }
    }

    /// Full JWKS URL for `JWKS_URL`.
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Replace the served key set.
    pub fn publish(&self, keys: &[&TestSigningKey]) {
        *self.responder.published.lock().unwrap() = Published::Keys(key_set(keys));
    }

    /// Serve a raw document, for malformed key set tests.
    pub fn publish_raw(&self, body: Value) {
        *self.responder.published.lock().unwrap() = Published::Keys(body);
    }

    /// Answer every fetch with a bodiless `status`.
    pub fn fail_with(&self, status: u16) {
        *self.responder.published.lock().unwrap() = Published::Failure(status);
    }

    /// Number of key set fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.responder.hits.load(Ordering::SeqCst)
    }
}

fn key_set(keys: &[&TestSigningKey]) -> Value {
    json!({ "keys": keys.iter().map(|key| key.jwk()).collect::<Vec<_>>() })
}
