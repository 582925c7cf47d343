use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::model::User;

// =============================================================================
// ENVELOPE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn data_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn status(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: Some(message.into()),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_verification: Option<bool>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            requires_verification: None,
        }
    }
}

// =============================================================================
// USER
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub user: UserResponse,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthData {
    pub user: UserResponse,
    pub access_token: String,
    pub is_new_user: bool,
}

// =============================================================================
// REGISTER / LOGIN
// =============================================================================

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleLoginRequest {
    #[validate(length(min = 1, message = "Google ID is required"))]
    pub google_id: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

// =============================================================================
// PASSWORD RESET
// =============================================================================

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub reset_token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

// =============================================================================
// EMAIL VERIFICATION
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ResendVerificationRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckEmailQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckEmailData {
    pub exists: bool,
}

// =============================================================================
// PROFILE / TOKENS
// =============================================================================

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateTokenRequest {
    pub access_token: Option<String>,
}

/// First human-readable message out of a validator error set.
pub fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid request".to_string())
}
