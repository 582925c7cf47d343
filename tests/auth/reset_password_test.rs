use axum::http::StatusCode;
use realvid_auth::services::email::EmailKind;
use serde_json::json;

use crate::common::{forwarded_for, test_email, test_password, TestContext};

async fn request_reset(ctx: &TestContext, email: &str) -> String {
    ctx.server
        .post("/api/auth/forgot-password")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .json(&json!({ "email": email }))
        .await
        .assert_status_ok();
    ctx.outbox
        .last_token(EmailKind::PasswordReset)
        .await
        .expect("reset email")
}

#[tokio::test]
async fn reset_password_changes_password_once() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;
    ctx.verify().await;
    let token = request_reset(&ctx, &email).await;

    let response = ctx
        .server
        .post("/api/auth/reset-password")
        .json(&json!({ "resetToken": &token, "newPassword": "BrandNewPass1!" }))
        .await;
    response.assert_status_ok();

    ctx.login(&email, "BrandNewPass1!").await.assert_status_ok();
    ctx.login(&email, test_password())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let replay = ctx
        .server
        .post("/api/auth/reset-password")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .json(&json!({ "resetToken": &token, "newPassword": "AnotherPass1!" }))
        .await;
    replay.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = replay.json();
    assert_eq!(body["message"], "This reset link has already been used");
}

#[tokio::test]
async fn reset_password_rejects_access_tokens() {
    let ctx = TestContext::new().await;
    let body = ctx.register(&test_email()).await;
    let access_token = body["data"]["accessToken"].as_str().unwrap();

    let response = ctx
        .server
        .post("/api/auth/reset-password")
        .json(&json!({ "resetToken": access_token, "newPassword": "BrandNewPass1!" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Invalid token type");
}

#[tokio::test]
async fn reset_password_rejects_garbage_token() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/api/auth/reset-password")
        .json(&json!({ "resetToken": "not.a.token", "newPassword": "BrandNewPass1!" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn reset_password_for_deleted_user_is_user_not_found() {
    let ctx = TestContext::new().await;
    let token = ctx
        .state
        .jwt_service
        .issue_reset_token("missing-user", "ghost@example.com")
        .unwrap();

    let response = ctx
        .server
        .post("/api/auth/reset-password")
        .json(&json!({ "resetToken": token, "newPassword": "BrandNewPass1!" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn reset_password_enforces_minimum_length() {
    let ctx = TestContext::new().await;

    ctx.server
        .post("/api/auth/reset-password")
        .json(&json!({ "resetToken": "x", "newPassword": "short" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
