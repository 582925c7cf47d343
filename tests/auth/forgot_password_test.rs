use realvid_auth::services::email::EmailKind;
use realvid_auth::services::hashing;
use serde_json::json;

use crate::common::{forwarded_for, test_email, TestContext};

#[tokio::test]
async fn forgot_password_answers_the_same_for_unknown_email() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;

    let known = ctx
        .server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": &email }))
        .await;
    let unknown = ctx
        .server
        .post("/api/auth/forgot-password")
        .add_header(forwarded_for(), ctx.fresh_ip())
        .json(&json!({ "email": "nobody@example.com" }))
        .await;

    known.assert_status_ok();
    unknown.assert_status_ok();
    let known: serde_json::Value = known.json();
    let unknown: serde_json::Value = unknown.json();

    assert_eq!(known, unknown);
    assert_eq!(known["success"], true);
    assert_eq!(ctx.outbox.count(EmailKind::PasswordReset).await, 1);
}

#[tokio::test]
async fn forgot_password_stores_only_the_token_hash() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;

    ctx.server
        .post("/api/auth/forgot-password")
        .json(&json!({ "email": &email }))
        .await
        .assert_status_ok();

    let token = ctx.outbox.last_token(EmailKind::PasswordReset).await.unwrap();
    let user = ctx
        .state
        .auth
        .store()
        .find_by_email(&email)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        user.password_reset_token.as_deref(),
        Some(hashing::sha256_hex(&token).as_str())
    );
    assert!(user.password_reset_expires.is_some());
}
