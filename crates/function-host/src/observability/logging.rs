//! Log filter defaults.
//!
//! Most events carry an explicit dotted target (`fh.auth.jwks`,
//! `common.jwt`) rather than the module path, so the default filter names
//! those prefixes as well as the crate names.

use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "function_host=debug,fh=debug,common=debug,tower_http=debug";

/// `RUST_LOG` if set and valid, otherwise [`DEFAULT_LOG_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}
