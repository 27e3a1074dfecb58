//! Test server harness for E2E testing
//!
//! Provides `TestFunctionHost` for spawning real function host instances in
//! tests.

use function_host::auth::{HttpKeySetSource, KeySetCache, TokenAuthorizer};
use function_host::config::Config;
use function_host::observability::metrics::init_metrics_recorder;
use function_host::routes::{self, AppState};
use function_host::services::InMemorySnippetStore;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the function host in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let host = TestFunctionHost::spawn(&[]).await?;
///
///     let response = reqwest::get(format!("{}/api/health", host.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestFunctionHost {
    addr: SocketAddr,
    config: Config,
    authorizer: Arc<TokenAuthorizer>,
    _handle: JoinHandle<()>,
}

impl TestFunctionHost {
    /// Spawn a host configured by `vars` on top of test defaults.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Use a 1 second JWKS fetch timeout unless overridden
    /// - Start the HTTP server in the background
    pub async fn spawn(vars: &[(&str, &str)]) -> Result<Self, anyhow::Error> {
        let mut env = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "1".to_string()),
            ("DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);
        for (name, value) in vars {
            env.insert((*name).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&env)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let source = Arc::new(HttpKeySetSource::new(
            config.jwks_url.clone(),
            config.jwks_fetch_timeout,
        ));
        let key_set = Arc::new(KeySetCache::new(source, config.jwks_cache_ttl));
        let authorizer = Arc::new(TokenAuthorizer::new(key_set, config.authorizer_settings()));

        let state = Arc::new(AppState {
            config: config.clone(),
            authorizer: authorizer.clone(),
            snippets: Arc::new(InMemorySnippetStore::new()),
        });

        // Build routes using the host's real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            authorizer,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the host configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The authorizer the running host uses, for cache inspection.
    pub fn authorizer(&self) -> &Arc<TokenAuthorizer> {
        &self.authorizer
    }
}

impl Drop for TestFunctionHost {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
