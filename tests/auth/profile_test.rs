use axum::http::StatusCode;
use serde_json::json;

use crate::common::{forwarded_for, test_email, TestContext};

#[tokio::test]
async fn update_profile_changes_only_given_fields() {
    let ctx = TestContext::new().await;
    let access_token = ctx.verified_user(&test_email()).await;

    let response = ctx
        .server
        .put("/api/auth/profile")
        .authorization_bearer(&access_token)
        .json(&json!({ "lastName": "Smith" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["user"]["firstName"], "Jane");
    assert_eq!(body["data"]["user"]["lastName"], "Smith");
    assert_eq!(body["data"]["user"]["phone"], "5551234567");
}

#[tokio::test]
async fn update_profile_sanitizes_names_and_phone() {
    let ctx = TestContext::new().await;
    let access_token = ctx.verified_user(&test_email()).await;

    let response = ctx
        .server
        .put("/api/auth/profile")
        .authorization_bearer(&access_token)
        .json(&json!({
            "firstName": "<script>x</script>Janet",
            "phone": "+1 (555) 000-1111 <b>"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["data"]["user"]["firstName"], "xJanet");
    assert_eq!(body["data"]["user"]["phone"], "+1 (555) 000-1111");
}

#[tokio::test]
async fn update_profile_requires_bearer_token() {
    let ctx = TestContext::new().await;

    ctx.server
        .put("/api/auth/profile")
        .json(&json!({ "firstName": "Nope" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_acknowledges_authenticated_user() {
    let ctx = TestContext::new().await;
    let access_token = ctx.verified_user(&test_email()).await;

    let response = ctx
        .server
        .post("/api/auth/logout")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .authorization_bearer(&access_token)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);

    ctx.server
        .post("/api/auth/logout")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
