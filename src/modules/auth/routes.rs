use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::AppState;
use super::controller;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/csrf-token", get(controller::csrf_token))
        .route("/register", post(controller::register))
        .route("/login", post(controller::login))
        .route("/google", post(controller::google_login))
        .route("/me", get(controller::me))
        .route("/profile", put(controller::update_profile))
        .route("/logout", post(controller::logout))
        .route("/forgot-password", post(controller::forgot_password))
        .route("/reset-password", post(controller::reset_password))
        .route("/verify-email", get(controller::verify_email))
        .route("/resend-verification", post(controller::resend_verification))
        .route("/check-email", get(controller::check_email))
        .route("/validate-token", post(controller::validate_token))
        .route("/clear-expired-tokens", post(controller::clear_expired_tokens))
}
