use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::interface::{AuthError, Result, UserRepository};
use super::model::{ProfileUpdate, User};

/// Process-local user store for development without MySQL and for tests.
/// Unique checks run under the same write lock as the insert.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    fn conflicts(existing: &HashMap<String, User>, user: &User) -> Option<AuthError> {
        for other in existing.values().filter(|u| u.id != user.id) {
            if other.email == user.email {
                return Some(AuthError::DuplicateEmail);
            }
            if user.google_id.is_some() && other.google_id == user.google_id {
                return Some(AuthError::Validation(
                    "This Google account is already linked to another user".into(),
                ));
            }
        }
        None
    }

    async fn find_where<F>(&self, predicate: F) -> Option<User>
    where
        F: Fn(&User) -> bool,
    {
        self.users.read().await.values().find(|u| predicate(u)).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if let Some(err) = Self::conflicts(&users, user) {
            return Err(err);
        }
        if users.contains_key(&user.id) {
            return Err(AuthError::Internal(format!("duplicate user id {}", user.id)));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.find_where(|u| u.email == email).await)
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        Ok(self
            .find_where(|u| u.google_id.as_deref() == Some(google_id))
            .await)
    }

    async fn find_by_verification_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        Ok(self
            .find_where(|u| {
                u.email_verification_token.as_deref() == Some(token_hash)
                    && u.email_verification_expires.is_some_and(|exp| exp > now)
            })
            .await)
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(AuthError::UserNotFound);
        }
        if let Some(err) = Self::conflicts(&users, user) {
            return Err(err);
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        id: &str,
        password_hash: &str,
        used_token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(id) else {
            return Ok(false);
        };
        if user.last_used_reset_token.as_deref() == Some(used_token_hash) {
            return Ok(false);
        }
        user.password_hash = password_hash.to_string();
        user.last_used_reset_token = Some(used_token_hash.to_string());
        user.clear_password_reset();
        user.updated_at = now;
        Ok(true)
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(id).map(|user| {
            update.apply(user);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn clear_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut users = self.users.write().await;
        Ok(users
            .values_mut()
            .map(|user| user.clear_expired_tokens(now))
            .sum())
    }
}
