mod mailer;
mod reset;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

use crate::db::Database;
use crate::models::User;

pub use mailer::{LogMailer, Mailer};
pub(crate) use reset::{
    issue_password_reset, reset_password, verify_reset_token, IssueOptions, IssueResult,
    ResetTicket, MIN_TOKEN_LEN,
};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User already exists")]
    AlreadyExists,

    /// Unknown email and wrong password look the same to the caller.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid reset token")]
    InvalidToken,

    #[error("Reset token already used")]
    TokenUsed,

    #[error("Reset token expired")]
    TokenExpired,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(e: anyhow::Error) -> Self {
        AuthError::Storage(format!("{e:#}"))
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Argon2id PHC string with a fresh random salt.
pub fn hash_secret(secret: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_secret(secret: &str, phc: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| {
            Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Create a guest account. A paid subscription later promotes it.
pub(crate) fn register(
    db: &Database,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> AuthResult<User> {
    let email = normalize_email(email);
    if email.is_empty() || !email.contains('@') {
        return Err(AuthError::InvalidInput("email is required".into()));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidInput("password is required".into()));
    }
    if db.get_user_by_email(&email)?.is_some() {
        return Err(AuthError::AlreadyExists);
    }

    let name = name.map(str::trim).filter(|n| !n.is_empty()).map(String::from);
    let user = User::new(email, hash_secret(password)?, name);
    db.insert_user(&user)?;
    tracing::info!(user_id = %user.id, email = %mask_email(&user.email), "user registered");
    Ok(user)
}

pub(crate) fn authenticate(db: &Database, email: &str, password: &str) -> AuthResult<User> {
    let email = normalize_email(email);
    match db.get_user_by_email(&email)? {
        Some(user) if verify_secret(password, &user.password_hash) => Ok(user),
        _ => {
            tracing::warn!(email = %mask_email(&email), "login failed");
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// `juan@x.com` becomes `j**n@x.com`; local parts of two chars or fewer keep
/// only their first char.
pub fn mask_email(email: &str) -> String {
    let (user, domain) = email.split_once('@').unwrap_or((email, ""));
    let chars: Vec<char> = user.chars().collect();
    let masked = match chars.as_slice() {
        [] => "*".to_string(),
        [first] | [first, _] => format!("{first}*"),
        [first, middle @ .., last] => {
            format!("{first}{}{last}", "*".repeat(middle.len()))
        }
    };
    format!("{masked}@{domain}")
}
