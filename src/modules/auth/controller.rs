use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::modules::auth::{
    extractors::{AuthUser, ValidJson},
    interface::{AuthError, GoogleProfile, NewUser},
    model::ProfileUpdate,
    service::VERIFY_EMAIL_MESSAGE,
    schema::{
        ApiResponse, AuthData, CheckEmailData, CheckEmailQuery, ForgotPasswordRequest,
        GoogleAuthData, GoogleLoginRequest, LoginRequest, RegisterRequest,
        ResendVerificationRequest, ResetPasswordRequest, UpdateProfileRequest, UserData,
        ValidateTokenRequest, VerifyEmailQuery,
    },
};
use crate::services::csrf::CsrfToken;
use crate::AppState;

type HandlerResult<T> = Result<Json<ApiResponse<T>>, AuthError>;

pub async fn csrf_token(State(state): State<Arc<AppState>>) -> HandlerResult<CsrfToken> {
    let token = state
        .csrf
        .issue_token()
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    Ok(Json(ApiResponse::data(token)))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthData>>), AuthError> {
    let session = state
        .auth
        .register(NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            password: req.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data_with_message(
            AuthData {
                user: session.user.into(),
                access_token: session.access_token,
            },
            "Registration successful. Please check your email to verify your account.",
        )),
    ))
}

/// Correct credentials on an unverified account answer 403 with
/// `requiresVerification`, never a token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> HandlerResult<AuthData> {
    let session = state.auth.login(&req.email, &req.password).await?;
    if !session.user.is_email_verified {
        return Err(AuthError::EmailNotVerified);
    }

    Ok(Json(ApiResponse::data_with_message(
        AuthData {
            user: session.user.into(),
            access_token: session.access_token,
        },
        "Login successful",
    )))
}

pub async fn google_login(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<GoogleLoginRequest>,
) -> HandlerResult<GoogleAuthData> {
    let result = state
        .auth
        .google_login(GoogleProfile {
            google_id: req.google_id,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
        })
        .await?;

    Ok(Json(ApiResponse::data_with_message(
        GoogleAuthData {
            user: result.user.into(),
            access_token: result.access_token,
            is_new_user: result.is_new_user,
        },
        "Google login successful",
    )))
}

pub async fn me(State(state): State<Arc<AppState>>, auth_user: AuthUser) -> HandlerResult<UserData> {
    let user = state.auth.current_user(auth_user.user_id()).await?;
    Ok(Json(ApiResponse::data(UserData { user: user.into() })))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> HandlerResult<UserData> {
    let update = ProfileUpdate {
        first_name: req.first_name.map(|v| v.trim().to_string()),
        last_name: req.last_name.map(|v| v.trim().to_string()),
        phone: req.phone.map(|v| v.trim().to_string()),
    };
    let user = state.auth.update_profile(auth_user.user_id(), update).await?;

    Ok(Json(ApiResponse::data_with_message(
        UserData { user: user.into() },
        "Profile updated successfully",
    )))
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout(auth_user: AuthUser) -> Json<ApiResponse<()>> {
    tracing::info!(user_id = %auth_user.user_id(), "user logged out");
    Json(ApiResponse::message("Logged out successfully"))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ForgotPasswordRequest>,
) -> HandlerResult<()> {
    let message = state.auth.forgot_password(&req.email).await?;
    Ok(Json(ApiResponse::message(message)))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> HandlerResult<()> {
    let message = state
        .auth
        .reset_password(&req.reset_token, &req.new_password)
        .await?;
    Ok(Json(ApiResponse::message(message)))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyEmailQuery>,
) -> HandlerResult<UserData> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AuthError::Validation("Verification token is required".into()))?;

    let user = state.auth.verify_email(&token).await?;
    Ok(Json(ApiResponse::data_with_message(
        UserData { user: user.into() },
        VERIFY_EMAIL_MESSAGE,
    )))
}

pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ResendVerificationRequest>,
) -> HandlerResult<()> {
    let message = state.auth.resend_verification(&req.email).await?;
    Ok(Json(ApiResponse::message(message)))
}

pub async fn check_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckEmailQuery>,
) -> HandlerResult<CheckEmailData> {
    let email = query
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AuthError::Validation("Email is required".into()))?;

    let exists = state.auth.check_email(&email).await?;
    Ok(Json(ApiResponse::data(CheckEmailData { exists })))
}

/// Always 200; `success` carries the verdict.
pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ValidateTokenRequest>,
) -> Json<ApiResponse<()>> {
    let valid = req
        .access_token
        .as_deref()
        .is_some_and(|token| state.auth.validate_access_token(token));

    let message = if valid { "Token is valid" } else { "Token is invalid or expired" };
    Json(ApiResponse::status(valid, message))
}

pub async fn clear_expired_tokens(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> HandlerResult<()> {
    let cleared = state.auth.clear_expired_tokens().await?;
    tracing::info!(user_id = %auth_user.user_id(), cleared, "expired token sweep requested");
    Ok(Json(ApiResponse::message(format!(
        "Cleared {cleared} expired token(s)"
    ))))
}
