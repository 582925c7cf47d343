use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool};

use super::interface::{AuthError, Result, UserRepository};
use super::model::{ProfileUpdate, User};

const USER_COLUMNS: &str = r#"
    id, first_name, last_name, email, phone, password_hash, is_email_verified,
    email_verification_token, email_verification_expires,
    password_reset_token, password_reset_expires, last_used_reset_token,
    google_id, google_email, created_at, updated_at
"#;

/// MySQL-backed user store. Uniqueness of `email` and `google_id` comes
/// from the table's unique indexes.
#[derive(Clone)]
pub struct UserCrud {
    pool: Pool<MySql>,
}

impl UserCrud {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ? LIMIT 1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

fn map_unique_violation(e: sqlx::Error) -> AuthError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            if db.message().contains("google_id") {
                AuthError::Validation("This Google account is already linked to another user".into())
            } else {
                AuthError::DuplicateEmail
            }
        }
        _ => AuthError::Database(e),
    }
}

#[async_trait]
impl UserRepository for UserCrud {
    async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, first_name, last_name, email, phone, password_hash, is_email_verified,
                email_verification_token, email_verification_expires,
                password_reset_token, password_reset_expires, last_used_reset_token,
                google_id, google_email, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.is_email_verified)
        .bind(&user.email_verification_token)
        .bind(user.email_verification_expires)
        .bind(&user.password_reset_token)
        .bind(user.password_reset_expires)
        .bind(&user.last_used_reset_token)
        .bind(&user.google_id)
        .bind(&user.google_email)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        self.find_one("id", id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        self.find_one("google_id", google_id).await
    }

    async fn find_by_verification_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE email_verification_token = ? AND email_verification_expires > ? LIMIT 1"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                first_name = ?, last_name = ?, email = ?, phone = ?, password_hash = ?,
                is_email_verified = ?,
                email_verification_token = ?, email_verification_expires = ?,
                password_reset_token = ?, password_reset_expires = ?,
                last_used_reset_token = ?, google_id = ?, google_email = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.is_email_verified)
        .bind(&user.email_verification_token)
        .bind(user.email_verification_expires)
        .bind(&user.password_reset_token)
        .bind(user.password_reset_expires)
        .bind(&user.last_used_reset_token)
        .bind(&user.google_id)
        .bind(&user.google_email)
        .bind(user.updated_at)
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    async fn consume_reset_token(
        &self,
        id: &str,
        password_hash: &str,
        used_token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = ?, last_used_reset_token = ?,
                password_reset_token = NULL, password_reset_expires = NULL,
                updated_at = ?
            WHERE id = ?
              AND (last_used_reset_token IS NULL OR last_used_reset_token <> ?)
            "#,
        )
        .bind(password_hash)
        .bind(used_token_hash)
        .bind(now)
        .bind(id)
        .bind(used_token_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<Option<User>> {
        sqlx::query(
            r#"
            UPDATE users SET
                first_name = COALESCE(?, first_name),
                last_name = COALESCE(?, last_name),
                phone = COALESCE(?, phone),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        // rows_affected is 0 for matched-but-unchanged rows, so re-read instead
        self.find_by_id(id).await
    }

    async fn clear_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let verification = sqlx::query(
            r#"
            UPDATE users
            SET email_verification_token = NULL, email_verification_expires = NULL
            WHERE email_verification_expires < ?
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let reset = sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = NULL, password_reset_expires = NULL
            WHERE password_reset_expires < ?
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(verification.rows_affected() + reset.rows_affected())
    }
}
