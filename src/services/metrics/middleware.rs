use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use super::MetricsRegistry;

/// Middleware to collect HTTP request metrics
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRegistry>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let endpoint = match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_path(req.uri().path()),
    };

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    metrics
        .http_requests_total
        .with_label_values(&[&method, &endpoint, &status])
        .inc();

    metrics
        .http_request_duration_seconds
        .with_label_values(&[&method, &endpoint])
        .observe(duration);

    response
}

/// Label for requests that matched no route. Id-like segments collapse to
/// `:id` and anything past three segments is dropped, so scanners probing
/// random paths cannot blow up label cardinality.
fn normalize_path(path: &str) -> String {
    let normalized: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .take(3)
        .map(|segment| if is_id_like(segment) { ":id" } else { segment })
        .collect();

    format!("/{}", normalized.join("/"))
}

fn is_id_like(segment: &str) -> bool {
    // UUID
    if segment.len() == 36 && segment.chars().filter(|c| *c == '-').count() == 4 {
        return true;
    }

    if segment.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    // hex tokens (verification, csrf)
    segment.len() >= 32 && segment.chars().all(|c| c.is_ascii_hexdigit())
}
