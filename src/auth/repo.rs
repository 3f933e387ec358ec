use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::auth::repo_types::User;
use crate::error::{AppError, AppResult};

/// Emails are compared and stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Find a user by (normalized) email.
    pub async fn find_by_email(db: &SqlitePool, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user. Fails with `DuplicateEmail` when the normalized
    /// email is already taken; the unique constraint is the arbiter.
    pub async fn create(db: &SqlitePool, email: &str, password_hash: &str) -> AppResult<User> {
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, created_at)
            VALUES (?, ?, ?)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(normalize_email(email))
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }
}
