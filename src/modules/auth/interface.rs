use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};

use super::model::{ProfileUpdate, User};
use super::schema::ErrorResponse;

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

pub type Result<T> = std::result::Result<T, AuthError>;

/// Persistence for user records. Implementations must enforce unique
/// `email` and unique non-null `google_id` themselves and report a
/// violation as `AuthError::DuplicateEmail`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>>;
    async fn find_by_verification_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>>;
    async fn update(&self, user: &User) -> Result<()>;
    /// Swaps in `password_hash`, records `used_token_hash` and clears the
    /// reset fields, but only while `used_token_hash` is not already the
    /// last used token. Returns false when another request got there first.
    async fn consume_reset_token(
        &self,
        id: &str,
        password_hash: &str,
        used_token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;
    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Option<User>>;
    async fn clear_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64>;
}

// =============================================================================
// SERVICE RESULT TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct GoogleLoginResult {
    pub user: User,
    pub access_token: String,
    pub is_new_user: bool,
}

#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub google_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Please verify your email address before logging in")]
    EmailNotVerified,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Invalid token type")]
    InvalidTokenType,

    #[error("This reset link has already been used")]
    TokenAlreadyUsed,

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("User not found")]
    UserNotFound,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or missing CSRF token")]
    CsrfInvalid,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateEmail => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::EmailNotVerified => StatusCode::FORBIDDEN,
            Self::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            Self::InvalidTokenType => StatusCode::BAD_REQUEST,
            Self::TokenAlreadyUsed => StatusCode::BAD_REQUEST,
            Self::AlreadyVerified => StatusCode::BAD_REQUEST,
            Self::UserNotFound => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::CsrfInvalid => StatusCode::FORBIDDEN,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client. Infrastructure details only leave
    /// the process in debug builds.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) if !cfg!(debug_assertions) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = ErrorResponse::new(self.public_message());
        if matches!(self, Self::EmailNotVerified) {
            body.requires_verification = Some(true);
        }

        (status, Json(body)).into_response()
    }
}
