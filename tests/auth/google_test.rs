use axum::http::StatusCode;
use serde_json::json;

use crate::common::{forwarded_for, test_email, TestContext};

fn google_body(google_id: &str, email: &str) -> serde_json::Value {
    json!({
        "googleId": google_id,
        "email": email,
        "firstName": "Sam",
        "lastName": "Agent"
    })
}

#[tokio::test]
async fn first_google_login_creates_verified_user() {
    let ctx = TestContext::new().await;
    let email = test_email();

    let response = ctx
        .server
        .post("/api/auth/google")
        .json(&google_body("g-100", &email))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["isNewUser"], true);
    assert_eq!(body["data"]["user"]["isEmailVerified"], true);
    assert!(body["data"]["accessToken"].is_string());
}

#[tokio::test]
async fn google_login_links_existing_account_by_email() {
    let ctx = TestContext::new().await;
    let email = test_email();
    let registered = ctx.register(&email).await;
    let user_id = registered["data"]["user"]["id"].as_str().unwrap().to_string();

    let response = ctx
        .server
        .post("/api/auth/google")
        .json(&google_body("g-200", &email))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["isNewUser"], false);
    assert_eq!(body["data"]["user"]["id"], user_id);
    assert_eq!(body["data"]["user"]["isEmailVerified"], true);
}

#[tokio::test]
async fn returning_google_user_matches_by_google_id() {
    let ctx = TestContext::new().await;
    let first: serde_json::Value = ctx
        .server
        .post("/api/auth/google")
        .json(&google_body("g-300", &test_email()))
        .await
        .json();

    let second: serde_json::Value = ctx
        .server
        .post("/api/auth/google")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .json(&google_body("g-300", &test_email()))
        .await
        .json();

    assert_eq!(second["data"]["isNewUser"], false);
    assert_eq!(second["data"]["user"]["id"], first["data"]["user"]["id"]);
}

#[tokio::test]
async fn google_login_without_google_id_is_rejected() {
    let ctx = TestContext::new().await;

    ctx.server
        .post("/api/auth/google")
        .json(&json!({ "email": test_email() }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
