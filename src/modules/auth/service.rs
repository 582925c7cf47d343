use std::sync::Arc;

use super::interface::{
    AuthError, AuthSession, GoogleLoginResult, GoogleProfile, NewUser, Result,
};
use super::model::{ProfileUpdate, User};
use super::store::{normalize_email, CredentialStore};
use crate::services::email::Mailer;
use crate::services::jwt::JwtService;
use crate::services::metrics::MetricsRegistry;

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";
pub const RESET_PASSWORD_MESSAGE: &str = "Password has been reset successfully";
pub const VERIFY_EMAIL_MESSAGE: &str = "Email verified successfully";
pub const RESEND_VERIFICATION_MESSAGE: &str = "Verification email sent";

/// Auth flows over the credential store, token codec and mailer.
#[derive(Clone)]
pub struct AuthService {
    store: CredentialStore,
    jwt: Arc<JwtService>,
    mailer: Mailer,
    metrics: Arc<MetricsRegistry>,
}

impl AuthService {
    pub fn new(
        store: CredentialStore,
        jwt: Arc<JwtService>,
        mailer: Mailer,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            store,
            jwt,
            mailer,
            metrics,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    fn access_token(&self, user: &User) -> Result<String> {
        self.jwt
            .issue_access_token(&user.id, &user.email)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Creates the account and returns a token straight away. The token is
    /// valid, but login stays blocked until the email is verified.
    pub async fn register(&self, new_user: NewUser) -> Result<AuthSession> {
        require("First name", &new_user.first_name)?;
        require("Last name", &new_user.last_name)?;
        require("Email", &new_user.email)?;
        require("Password", &new_user.password)?;

        let (user, verification_token) = match self.store.create(new_user).await {
            Ok(created) => created,
            Err(e) => {
                self.metrics.record_auth_event("register", "failure");
                return Err(e);
            }
        };
        let access_token = self.access_token(&user)?;

        self.mailer
            .send_verification(&user.email, &user.first_name, &verification_token)
            .await;

        self.metrics.record_auth_event("register", "success");
        Ok(AuthSession { user, access_token })
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let user = match self.store.find_by_email(email).await? {
            Some(user) if self.store.verify_password(&user, password).await => user,
            _ => {
                self.metrics.record_auth_event("login", "failure");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let access_token = self.access_token(&user)?;
        self.metrics.record_auth_event("login", "success");
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(AuthSession { user, access_token })
    }

    /// Precedence: google_id match, then email match (links the Google
    /// identity to the existing account), then a new account.
    pub async fn google_login(&self, profile: GoogleProfile) -> Result<GoogleLoginResult> {
        require("Google ID", &profile.google_id)?;
        require("Email", &profile.email)?;

        if let Some(user) = self.store.find_by_google_id(&profile.google_id).await? {
            let access_token = self.access_token(&user)?;
            self.metrics.record_auth_event("google_login", "existing");
            return Ok(GoogleLoginResult {
                user,
                access_token,
                is_new_user: false,
            });
        }

        if let Some(mut user) = self.store.find_by_email(&profile.email).await? {
            user.google_id = Some(profile.google_id.clone());
            user.google_email = Some(normalize_email(&profile.email));
            user.is_email_verified = true;
            user.clear_email_verification();
            self.store.save(&mut user).await?;

            tracing::info!(user_id = %user.id, "linked google account");
            let access_token = self.access_token(&user)?;
            self.metrics.record_auth_event("google_login", "linked");
            return Ok(GoogleLoginResult {
                user,
                access_token,
                is_new_user: false,
            });
        }

        let user = self.store.create_federated(&profile).await?;
        let access_token = self.access_token(&user)?;
        self.metrics.record_auth_event("google_login", "created");
        Ok(GoogleLoginResult {
            user,
            access_token,
            is_new_user: true,
        })
    }

    /// Same answer whether or not the account exists.
    pub async fn forgot_password(&self, email: &str) -> Result<&'static str> {
        let Some(mut user) = self.store.find_by_email(email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(FORGOT_PASSWORD_MESSAGE);
        };

        let reset_token = self
            .jwt
            .issue_reset_token(&user.id, &user.email)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let expires = self
            .jwt
            .expiry_of(&reset_token)
            .ok_or_else(|| AuthError::Internal("reset token without expiry".into()))?;

        self.store.record_password_reset(&mut user, &reset_token, expires);
        self.store.save(&mut user).await?;

        self.mailer
            .send_password_reset(&user.email, &user.first_name, &reset_token)
            .await;

        self.metrics.record_auth_event("forgot_password", "sent");
        Ok(FORGOT_PASSWORD_MESSAGE)
    }

    /// The JWT proves authenticity and freshness; `last_used_reset_token`
    /// makes it single-use.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<&'static str> {
        require("Reset token", token)?;
        require("New password", new_password)?;

        let Some(claims) = self.jwt.verify(token) else {
            // decode is diagnostics only
            let reason = match self.jwt.decode(token) {
                Some(_) if self.jwt.is_expired(token) => "expired",
                Some(_) => "bad signature",
                None => "malformed",
            };
            tracing::info!(reason, "reset token rejected");
            self.metrics.record_auth_event("reset_password", "invalid_token");
            return Err(AuthError::InvalidOrExpiredToken);
        };

        if !claims.is_reset() {
            self.metrics.record_auth_event("reset_password", "wrong_type");
            return Err(AuthError::InvalidTokenType);
        }

        let mut user = self
            .store
            .find_by_id(&claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if self.store.is_reset_token_used(&user, token) {
            self.metrics.record_auth_event("reset_password", "replayed");
            return Err(AuthError::TokenAlreadyUsed);
        }

        if let Err(e) = self
            .store
            .consume_reset_token(&mut user, token, new_password)
            .await
        {
            if matches!(e, AuthError::TokenAlreadyUsed) {
                self.metrics.record_auth_event("reset_password", "replayed");
            }
            return Err(e);
        }

        tracing::info!(user_id = %user.id, "password reset");
        self.metrics.record_auth_event("reset_password", "success");
        Ok(RESET_PASSWORD_MESSAGE)
    }

    pub async fn verify_email(&self, token: &str) -> Result<User> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let mut user = self
            .store
            .find_by_verification_token(token)
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        user.is_email_verified = true;
        user.clear_email_verification();
        self.store.save(&mut user).await?;

        self.mailer.send_welcome(&user.email, &user.first_name).await;

        tracing::info!(user_id = %user.id, "email verified");
        self.metrics.record_auth_event("verify_email", "success");
        Ok(user)
    }

    pub async fn resend_verification(&self, email: &str) -> Result<&'static str> {
        let mut user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.is_email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let token = self.store.generate_email_verification_token(&mut user);
        self.store.save(&mut user).await?;

        self.mailer
            .send_verification(&user.email, &user.first_name, &token)
            .await;

        Ok(RESEND_VERIFICATION_MESSAGE)
    }

    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> Result<User> {
        if update.is_empty() {
            return self.current_user(user_id).await;
        }
        self.store
            .update_profile(user_id, &update)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn current_user(&self, user_id: &str) -> Result<User> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Reset tokens verify against the same key but are not access tokens.
    pub fn validate_access_token(&self, token: &str) -> bool {
        self.jwt.verify(token).is_some_and(|claims| !claims.is_reset())
    }

    pub async fn check_email(&self, email: &str) -> Result<bool> {
        self.store.email_exists(email).await
    }

    pub async fn clear_expired_tokens(&self) -> Result<u64> {
        let cleared = self.store.clear_expired_tokens().await?;
        tracing::info!(cleared, "cleared expired tokens");
        Ok(cleared)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    Ok(())
}
