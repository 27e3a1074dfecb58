//! Metrics definitions for the function host.
//!
//! All metrics follow Prometheus naming conventions:
//! - `fh_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: the fixed route table, tool routes collapsed, everything else `/other`
//! - `status`: success, error, timeout
//! - `result`: hit, unknown_kid, expired, empty, coalesced
//! - `outcome`: success or an `AuthFailure` kind

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("fh_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // JWKS fetches are bounded by the 10s client timeout
        .set_buckets_for_metric(
            Matcher::Prefix("fh_jwks_fetch".to_string()),
            &[
                0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `fh_http_requests_total`, `fh_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("fh_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("fh_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/api/health" | "/api/test-auth" | "/api/test-chat" | "/metrics" => path.to_string(),
        _ if is_tool_path(path) => "/api/tools/{tool_name}".to_string(),
        _ => "/other".to_string(),
    }
}

fn is_tool_path(path: &str) -> bool {
    path.strip_prefix("/api/tools/")
        .is_some_and(|tool| !tool.is_empty() && !tool.contains('/'))
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a JWKS fetch.
///
/// Metric: `fh_jwks_fetch_total`, `fh_jwks_fetch_duration_seconds`
/// Labels: `status` ("success" or "error")
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("fh_jwks_fetch_duration_seconds").record(duration.as_secs_f64());

    counter!("fh_jwks_fetch_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a signing key lookup against the cache.
///
/// Metric: `fh_jwks_cache_total`
/// Labels: `result`
pub fn record_jwks_cache(result: &str) {
    counter!("fh_jwks_cache_total",
        "result" => result.to_string()
    )
    .increment(1);
}

// ============================================================================
// Token Validation Metrics
// ============================================================================

/// Record the outcome of a bearer token validation.
///
/// Metric: `fh_token_validations_total`
/// Labels: `outcome` ("success" or an `AuthFailure::kind()`)
pub fn record_token_validation(outcome: &str) {
    counter!("fh_token_validations_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These execute the recording functions against the no-op global
    // recorder; values are checked end to end through `/metrics`.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/health", 200, Duration::from_millis(5));
        record_http_request("POST", "/api/test-chat", 401, Duration::from_millis(10));
        record_http_request("POST", "/api/tools/hello_mcp", 200, Duration::from_millis(2));
        record_http_request("GET", "/api/test-auth", 504, Duration::from_secs(30));
    }

    #[test]
    fn test_record_auth_metrics() {
        record_jwks_fetch("success", Duration::from_millis(120));
        record_jwks_fetch("error", Duration::from_secs(10));
        record_jwks_cache("hit");
        record_jwks_cache("coalesced");
        record_token_validation("success");
        record_token_validation("SignatureInvalid");
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(400), "error");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(404), "error");
        assert_eq!(categorize_status_code(500), "error");
    }

    #[test]
    fn test_normalize_endpoint_known_paths() {
        assert_eq!(normalize_endpoint("/api/health"), "/api/health");
        assert_eq!(normalize_endpoint("/api/test-auth"), "/api/test-auth");
        assert_eq!(normalize_endpoint("/api/test-chat"), "/api/test-chat");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
    }

    #[test]
    fn test_normalize_endpoint_tool_paths() {
        assert_eq!(
            normalize_endpoint("/api/tools/get_current_time"),
            "/api/tools/{tool_name}"
        );
        assert_eq!(
            normalize_endpoint("/api/tools/anything-at-all"),
            "/api/tools/{tool_name}"
        );
        assert_eq!(normalize_endpoint("/api/tools/"), "/other");
        assert_eq!(normalize_endpoint("/api/tools/a/b"), "/other");
    }

    #[test]
    fn test_normalize_endpoint_unknown_paths() {
        assert_eq!(normalize_endpoint("/"), "/other");
        assert_eq!(normalize_endpoint("/health"), "/other");
        assert_eq!(normalize_endpoint("/api/unknown"), "/other");
    }
}
