//! Request metrics for every response the host produces.
//!
//! Sits outside the router so rejections that never reach a handler are
//! counted too: 401s from the auth guard, 404s for unknown paths and tools,
//! 405s, and 408s from the timeout layer.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Records method, normalized endpoint, status and duration.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}
