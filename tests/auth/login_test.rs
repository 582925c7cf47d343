use axum::http::StatusCode;

use crate::common::{test_email, test_password, TestContext};

#[tokio::test]
async fn login_verified_user_returns_token() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;
    ctx.verify().await;

    let response = ctx.login(&email, test_password()).await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], email);
    assert_eq!(body["data"]["user"]["isEmailVerified"], true);

    let token = body["data"]["accessToken"].as_str().unwrap();
    let claims = ctx.state.jwt_service.verify(token).unwrap();
    assert_eq!(claims.email, email);
    assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
}

#[tokio::test]
async fn login_unverified_user_requires_verification() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;

    let response = ctx.login(&email, test_password()).await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["requiresVerification"], true);
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn login_failures_do_not_reveal_which_part_was_wrong() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;
    ctx.verify().await;

    let wrong_password = ctx.login(&email, "WrongPassword123!").await;
    let unknown_email = ctx.login("nobody@example.com", test_password()).await;

    wrong_password.assert_status(StatusCode::UNAUTHORIZED);
    unknown_email.assert_status(StatusCode::UNAUTHORIZED);

    let a: serde_json::Value = wrong_password.json();
    let b: serde_json::Value = unknown_email.json();
    assert_eq!(a, b);
    assert_eq!(a["message"], "Invalid email or password");
}

#[tokio::test]
async fn login_unverified_with_wrong_password_is_unauthorized() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;

    ctx.login(&email, "WrongPassword123!")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_is_case_insensitive_on_email() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email).await;
    ctx.verify().await;

    ctx.login(&email.to_uppercase(), test_password())
        .await
        .assert_status_ok();
}
