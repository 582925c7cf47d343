use axum::http::{header, StatusCode};
use serde_json::json;

use crate::common::TestContext;

#[tokio::test]
async fn health_reports_backends() {
    let ctx = TestContext::new().await;

    let response = ctx.server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["userStore"], "memory");
    assert_eq!(body["cacheStore"], "memory");
}

#[tokio::test]
async fn security_headers_on_success_and_rejection() {
    let ctx = TestContext::new().await;

    let ok = ctx.server.get("/health").await;
    assert_eq!(ok.headers()[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(ok.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

    let rejected = ctx.server.get("/api/auth/me").await;
    rejected.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(rejected.headers()[header::X_FRAME_OPTIONS], "DENY");
    assert!(rejected.headers().contains_key(header::STRICT_TRANSPORT_SECURITY));
}

#[tokio::test]
async fn metrics_expose_http_and_gatekeeper_series() {
    let ctx = TestContext::new().await;

    ctx.server.get("/api/auth/me").await;
    ctx.server
        .post("/api/auth/resend-verification")
        .json(&json!({ "email": "a@b.co" }))
        .await;

    let response = ctx.server.get("/metrics").await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("realvid_http_requests_total"));
    assert!(text.contains("endpoint=\"/api/auth/me\""));
    assert!(text.contains("realvid_unauthorized_total 1"));
    assert!(text.contains("realvid_csrf_rejections_total 1"));
}
