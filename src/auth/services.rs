use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::oauth::VerifiedIdentity;
use super::password::{hash_password, unguessable_credential, verify_password};
use super::repo::normalize_email;
use super::repo_types::User;
use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Creates a local account.
pub async fn register(db: &SqlitePool, email: &str, password: &str) -> AppResult<User> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Please enter email and password.".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Please enter a valid email address.".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }

    let hash = hash_password(password)?;
    let user = User::create(db, &email, &hash).await?;
    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Checks a password login. Unknown email and wrong password fail the same way.
pub async fn authenticate(db: &SqlitePool, email: &str, password: &str) -> AppResult<User> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Please enter email and password.".into()));
    }

    let Some(user) = User::find_by_email(db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(user)
}

/// Finds or creates the account for a provider-verified email.
pub async fn sign_in_verified(db: &SqlitePool, identity: &VerifiedIdentity) -> AppResult<User> {
    if let Some(user) = User::find_by_email(db, &identity.email).await? {
        return Ok(user);
    }
    match User::create(db, &identity.email, &unguessable_credential()?).await {
        Ok(user) => {
            info!(user_id = user.id, email = %user.email, "user provisioned from google");
            Ok(user)
        }
        // Lost a race with a concurrent first login.
        Err(AppError::DuplicateEmail) => User::find_by_email(db, &identity.email)
            .await?
            .ok_or(AppError::InvalidCredentials),
        Err(e) => Err(e),
    }
}
