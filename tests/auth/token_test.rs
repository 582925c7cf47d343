use axum::http::StatusCode;
use serde_json::json;

use crate::common::{forwarded_for, test_email, TestContext};

#[tokio::test]
async fn validate_token_reports_validity_in_success_flag() {
    let ctx = TestContext::new().await;
    let body = ctx.register(&test_email()).await;
    let access_token = body["data"]["accessToken"].as_str().unwrap();

    let valid: serde_json::Value = ctx
        .server
        .post("/api/auth/validate-token")
        .json(&json!({ "accessToken": access_token }))
        .await
        .json();
    assert_eq!(valid["success"], true);

    let response = ctx
        .server
        .post("/api/auth/validate-token")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .json(&json!({ "accessToken": "tampered" }))
        .await;
    response.assert_status_ok();
    let invalid: serde_json::Value = response.json();
    assert_eq!(invalid["success"], false);
}

#[tokio::test]
async fn check_email_reports_existence() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;

    let taken: serde_json::Value = ctx
        .server
        .get("/api/auth/check-email")
        .add_query_param("email", &email)
        .await
        .json();
    assert_eq!(taken["data"]["exists"], true);

    let free: serde_json::Value = ctx
        .server
        .get("/api/auth/check-email")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .add_query_param("email", "free@example.com")
        .await
        .json();
    assert_eq!(free["data"]["exists"], false);
}

#[tokio::test]
async fn clear_expired_tokens_requires_auth_and_reports_count() {
    let ctx = TestContext::new().await;
    let access_token = ctx.verified_user(&test_email()).await;

    ctx.server
        .post("/api/auth/clear-expired-tokens")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = ctx
        .server
        .post("/api/auth/clear-expired-tokens")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .authorization_bearer(&access_token)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Cleared 0 expired token(s)");
}
