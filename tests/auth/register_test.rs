use axum::http::StatusCode;
use realvid_auth::services::email::EmailKind;
use serde_json::json;

use crate::common::{forwarded_for, test_email, test_password, TestContext};

#[tokio::test]
async fn register_returns_created_user_and_token() {
    let ctx = TestContext::new().await;
    let email = test_email();

    let response = ctx
        .server
        .post("/api/auth/register")
        .json(&json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "email": &email,
            "phone": "5551234567",
            "password": test_password()
        }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], email);
    assert_eq!(body["data"]["user"]["isEmailVerified"], false);
    assert!(body["data"]["accessToken"].is_string());
    assert!(body["data"]["user"].get("passwordHash").is_none());
    assert!(body["data"]["user"].get("emailVerificationToken").is_none());

    assert_eq!(ctx.outbox.count(EmailKind::Verification).await, 1);
}

#[tokio::test]
async fn register_duplicate_email_returns_bad_request() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;

    let response = ctx
        .server
        .post("/api/auth/register")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .json(&json!({
            "firstName": "Other",
            "lastName": "Person",
            "email": email.to_uppercase(),
            "password": test_password()
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "User with this email already exists");
}

#[tokio::test]
async fn register_missing_fields_returns_bad_request() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/api/auth/register")
        .json(&json!({
            "email": test_email(),
            "password": test_password()
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("name is required"));
}

#[tokio::test]
async fn register_short_password_returns_bad_request() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/api/auth/register")
        .json(&json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "email": test_email(),
            "password": "short"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Password must be at least 8 characters");
}

#[tokio::test]
async fn register_malformed_json_uses_error_envelope() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/api/auth/register")
        .bytes(axum::body::Bytes::from_static(b"{not json"))
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
}
