use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::interface::{AuthError, GoogleProfile, NewUser, Result, UserRepository};
use super::model::{ProfileUpdate, User};
use crate::services::hashing;

const EMAIL_VERIFICATION_TTL_HOURS: i64 = 24;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Owns password hashing and token hashing on top of a `UserRepository`.
/// Plaintext passwords and tokens never reach the repository.
#[derive(Clone)]
pub struct CredentialStore {
    repo: Arc<dyn UserRepository>,
}

impl CredentialStore {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Creates a password account with a fresh email-verification token
    /// already set. Returns the user and the plaintext token for emailing.
    pub async fn create(&self, new_user: NewUser) -> Result<(User, String)> {
        let email = normalize_email(&new_user.email);
        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(new_user.password).await?;
        let now = Utc::now();
        let mut user = User {
            id: Uuid::new_v4().to_string(),
            first_name: new_user.first_name.trim().to_string(),
            last_name: new_user.last_name.trim().to_string(),
            email,
            phone: new_user
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            password_hash,
            is_email_verified: false,
            email_verification_token: None,
            email_verification_expires: None,
            password_reset_token: None,
            password_reset_expires: None,
            last_used_reset_token: None,
            google_id: None,
            google_email: None,
            created_at: now,
            updated_at: now,
        };
        let verification_token = self.generate_email_verification_token(&mut user);

        // the unique index still catches a concurrent insert of the same email
        self.repo.insert(&user).await?;

        tracing::info!(user_id = %user.id, "user created");
        Ok((user, verification_token))
    }

    /// Creates an already-verified account for a first Google sign-in. The
    /// password is random and never disclosed.
    pub async fn create_federated(&self, profile: &GoogleProfile) -> Result<User> {
        let password_hash = hash_password(hashing::random_token()).await?;
        let now = Utc::now();
        let email = normalize_email(&profile.email);
        let user = User {
            id: Uuid::new_v4().to_string(),
            first_name: profile.first_name.trim().to_string(),
            last_name: profile.last_name.trim().to_string(),
            email: email.clone(),
            phone: None,
            password_hash,
            is_email_verified: true,
            email_verification_token: None,
            email_verification_expires: None,
            password_reset_token: None,
            password_reset_expires: None,
            last_used_reset_token: None,
            google_id: Some(profile.google_id.clone()),
            google_email: Some(email),
            created_at: now,
            updated_at: now,
        };

        self.repo.insert(&user).await?;

        tracing::info!(user_id = %user.id, "federated user created");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.repo.find_by_email(&normalize_email(email)).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.repo.find_by_id(id).await
    }

    pub async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        self.repo.find_by_google_id(google_id).await
    }

    /// Looks up the owner of an unexpired verification token by its hash.
    pub async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>> {
        let token_hash = hashing::sha256_hex(token);
        self.repo
            .find_by_verification_token(&token_hash, Utc::now())
            .await
    }

    pub async fn verify_password(&self, user: &User, candidate: &str) -> bool {
        let hash = user.password_hash.clone();
        let candidate = candidate.to_string();
        tokio::task::spawn_blocking(move || hashing::verify_password(&candidate, &hash))
            .await
            .unwrap_or(false)
    }

    /// Sets a new 24h verification token on `user` (in memory; call `save`
    /// to persist) and returns the plaintext. Any previous token is replaced.
    pub fn generate_email_verification_token(&self, user: &mut User) -> String {
        let token = hashing::random_token();
        user.email_verification_token = Some(hashing::sha256_hex(&token));
        user.email_verification_expires =
            Some(Utc::now() + Duration::hours(EMAIL_VERIFICATION_TTL_HOURS));
        token
    }

    /// Remembers the hash of an issued reset token so the expiry sweep can
    /// clear it.
    pub fn record_password_reset(&self, user: &mut User, token: &str, expires: DateTime<Utc>) {
        user.password_reset_token = Some(hashing::sha256_hex(token));
        user.password_reset_expires = Some(expires);
    }

    pub fn is_reset_token_used(&self, user: &User, token: &str) -> bool {
        user.last_used_reset_token.as_deref() == Some(hashing::sha256_hex(token).as_str())
    }

    /// Re-hashes the password and burns the reset token that authorised it.
    /// The repository applies both in one conditional write, so of several
    /// concurrent requests with the same token exactly one succeeds and the
    /// rest get `TokenAlreadyUsed`.
    pub async fn consume_reset_token(
        &self,
        user: &mut User,
        token: &str,
        new_password: &str,
    ) -> Result<()> {
        let password_hash = hash_password(new_password.to_string()).await?;
        let used_token_hash = hashing::sha256_hex(token);
        let now = Utc::now();

        if !self
            .repo
            .consume_reset_token(&user.id, &password_hash, &used_token_hash, now)
            .await?
        {
            return Err(AuthError::TokenAlreadyUsed);
        }

        user.password_hash = password_hash;
        user.last_used_reset_token = Some(used_token_hash);
        user.clear_password_reset();
        user.updated_at = now;
        Ok(())
    }

    pub async fn save(&self, user: &mut User) -> Result<()> {
        user.updated_at = Utc::now();
        self.repo.update(user).await
    }

    pub async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Option<User>> {
        self.repo.update_profile(id, update).await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    pub async fn clear_expired_tokens(&self) -> Result<u64> {
        self.repo.clear_expired_tokens(Utc::now()).await
    }
}

async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hashing::hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .map_err(|e| AuthError::Internal(format!("Hashing error: {e}")))
}
