use axum::http::StatusCode;
use realvid_auth::services::email::EmailKind;
use serde_json::json;

use crate::common::{csrf_header, forwarded_for, test_email, TestContext};

#[tokio::test]
async fn verify_email_marks_user_verified_once() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;
    let token = ctx.outbox.last_token(EmailKind::Verification).await.unwrap();

    let response = ctx
        .server
        .get("/api/auth/verify-email")
        .add_query_param("token", &token)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["user"]["isEmailVerified"], true);
    assert_eq!(ctx.outbox.count(EmailKind::Welcome).await, 1);

    let replay = ctx
        .server
        .get("/api/auth/verify-email")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .add_query_param("token", &token)
        .await;
    replay.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = replay.json();
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn verify_email_without_token_is_bad_request() {
    let ctx = TestContext::new().await;

    ctx.server
        .get("/api/auth/verify-email")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verification_link_points_at_frontend() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;

    let message = ctx.outbox.last(EmailKind::Verification).await.unwrap();
    assert_eq!(message.to, email);
    assert!(message
        .action_url
        .unwrap()
        .starts_with("http://localhost:3000/verify-email?token="));
}

#[tokio::test]
async fn resend_verification_requires_csrf_token() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;

    let response = ctx
        .server
        .post("/api/auth/resend-verification")
        .json(&json!({ "email": &email }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(ctx.outbox.count(EmailKind::Verification).await, 1);
}

#[tokio::test]
async fn resend_verification_replaces_previous_token() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;
    let first = ctx.outbox.last_token(EmailKind::Verification).await.unwrap();

    let csrf = ctx.csrf_token().await;
    ctx.server
        .post("/api/auth/resend-verification")
        .add_header(csrf_header(), csrf.parse::<axum::http::HeaderValue>().unwrap())
        .json(&json!({ "email": &email }))
        .await
        .assert_status_ok();

    let second = ctx.outbox.last_token(EmailKind::Verification).await.unwrap();
    assert_ne!(first, second);

    ctx.server
        .get("/api/auth/verify-email")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .add_query_param("token", &first)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    ctx.server
        .get("/api/auth/verify-email")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .add_query_param("token", &second)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn resend_verification_for_verified_user_is_rejected() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;
    ctx.verify().await;

    let csrf = ctx.csrf_token().await;
    let response = ctx
        .server
        .post("/api/auth/resend-verification")
        .add_header(csrf_header(), csrf.parse::<axum::http::HeaderValue>().unwrap())
        .json(&json!({ "email": &email }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Email is already verified");
}
