//! Function Host
//!
//! Azure Functions custom handler entry point. Listens on
//! `FUNCTIONS_CUSTOMHANDLER_PORT` when started by the Functions host.

use function_host::auth::{HttpKeySetSource, KeySetCache, TokenAuthorizer};
use function_host::config::Config;
use function_host::observability::logging;
use function_host::observability::metrics::init_metrics_recorder;
use function_host::routes::{self, AppState};
use function_host::services::InMemorySnippetStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Function Host");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        environment = %config.environment_name(),
        jwks_url = %config.jwks_url,
        jwks_cache_ttl_seconds = config.jwks_cache_ttl.as_secs(),
        jwt_clock_skew_seconds = config.jwt_clock_skew.as_secs(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let source = Arc::new(HttpKeySetSource::new(
        config.jwks_url.clone(),
        config.jwks_fetch_timeout,
    ));
    let key_set = Arc::new(KeySetCache::new(source, config.jwks_cache_ttl));
    let authorizer = Arc::new(TokenAuthorizer::new(
        key_set.clone(),
        config.authorizer_settings(),
    ));

    // Warm the key set; requests refetch on demand if this fails
    tokio::spawn(async move {
        match key_set.force_refresh().await {
            Ok(()) => {
                let keys = key_set.key_count().await;
                info!(keys, "Signing key set warmed")
            }
            Err(e) => warn!(error = %e, "Initial signing key fetch failed, will retry on demand"),
        }
    });

    // Parse bind address before moving config
    let bind_address = config.bind_address.clone();
    let drain_seconds = config.drain_seconds;

    let state = Arc::new(AppState {
        config,
        authorizer,
        snippets: Arc::new(InMemorySnippetStore::new()),
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Function Host listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain_seconds))
    .await?;

    info!("Function Host shutdown complete");

    Ok(())
}

/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(logging::env_filter())
        .with(fmt_layer)
        .init();
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    }
}
