use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub is_email_verified: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_expires: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub last_used_reset_token: Option<String>,
    pub google_id: Option<String>,
    pub google_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn clear_email_verification(&mut self) {
        self.email_verification_token = None;
        self.email_verification_expires = None;
    }

    pub fn clear_password_reset(&mut self) {
        self.password_reset_token = None;
        self.password_reset_expires = None;
    }

    /// Drops token fields whose expiry has passed. Returns how many token
    /// pairs (verification, reset) were cleared.
    pub fn clear_expired_tokens(&mut self, now: DateTime<Utc>) -> u64 {
        let mut cleared = 0;
        if self.email_verification_expires.is_some_and(|exp| exp < now) {
            self.clear_email_verification();
            cleared += 1;
        }
        if self.password_reset_expires.is_some_and(|exp| exp < now) {
            self.clear_password_reset();
            cleared += 1;
        }
        cleared
    }
}

/// Partial profile update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(phone) = &self.phone {
            user.phone = Some(phone.clone());
        }
    }
}
