use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{DateTime, Duration, Utc};

use super::{hash_secret, normalize_email, verify_secret, AuthError, AuthResult, Mailer};
use crate::db::{Database, ResetCompletion};
use crate::models::PasswordReset;

const SELECTOR_BYTES: usize = 16;
const VERIFIER_BYTES: usize = 32;
const SELECTOR_LEN: usize = SELECTOR_BYTES * 2;

/// Anything shorter is rejected before touching storage.
pub const MIN_TOKEN_LEN: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct IssueOptions {
    pub ttl_minutes: i64,
    pub base_url: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Both fields are `None` for unknown emails, so callers can answer neutrally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueResult {
    pub token: Option<String>,
    pub reset_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTicket {
    pub reset_id: i64,
    pub user_id: String,
    pub email: String,
}

fn random_hex(len: usize) -> String {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

fn build_reset_url(base_url: &str, token: &str) -> String {
    format!(
        "{}/reset-password?token={token}",
        base_url.strip_suffix('/').unwrap_or(base_url)
    )
}

pub(crate) fn issue_password_reset(
    db: &Database,
    mailer: &dyn Mailer,
    email: &str,
    opts: &IssueOptions,
) -> AuthResult<IssueResult> {
    let email = normalize_email(email);
    let Some(user) = db.get_user_by_email(&email)? else {
        tracing::info!("password reset requested for unknown email");
        return Ok(IssueResult::default());
    };

    let selector = random_hex(SELECTOR_BYTES);
    let verifier = random_hex(VERIFIER_BYTES);
    let now = Utc::now();
    let reset = PasswordReset {
        id: None,
        selector: selector.clone(),
        verifier_hash: hash_secret(&verifier)?,
        user_id: user.id.clone(),
        email: email.clone(),
        created_at: now.to_rfc3339(),
        expires_at: (now + Duration::minutes(opts.ttl_minutes)).to_rfc3339(),
        consumed_at: None,
        ip: opts.ip.clone(),
        user_agent: opts.user_agent.clone(),
    };
    db.insert_password_reset(&reset)?;

    let token = format!("{selector}{verifier}");
    let reset_url = build_reset_url(&opts.base_url, &token);
    if let Err(e) = mailer.send_password_reset(&email, &reset_url) {
        tracing::error!(error = %format!("{e:#}"), "failed to send password reset email");
    }
    tracing::info!(user_id = %user.id, expires_at = %reset.expires_at, "password reset issued");

    Ok(IssueResult {
        token: Some(token),
        reset_url: Some(reset_url),
    })
}

pub(crate) fn verify_reset_token(db: &Database, token: &str) -> AuthResult<ResetTicket> {
    let token = token.trim();
    if token.len() < MIN_TOKEN_LEN || !token.is_ascii() {
        return Err(AuthError::InvalidToken);
    }
    let (selector, verifier) = token.split_at(SELECTOR_LEN);

    let reset = db
        .get_password_reset_by_selector(selector)?
        .ok_or(AuthError::InvalidToken)?;
    if !verify_secret(verifier, &reset.verifier_hash) {
        return Err(AuthError::InvalidToken);
    }
    if reset.is_consumed() {
        return Err(AuthError::TokenUsed);
    }
    let expired = DateTime::parse_from_rfc3339(&reset.expires_at)
        .map(|t| t.with_timezone(&Utc) <= Utc::now())
        .unwrap_or(true);
    if expired {
        return Err(AuthError::TokenExpired);
    }

    Ok(ResetTicket {
        reset_id: reset.id.ok_or(AuthError::InvalidToken)?,
        user_id: reset.user_id,
        email: reset.email,
    })
}

pub(crate) fn reset_password(db: &Database, token: &str, new_password: &str) -> AuthResult<()> {
    if new_password.is_empty() {
        return Err(AuthError::InvalidInput("password is required".into()));
    }
    let ticket = verify_reset_token(db, token)?;
    let hash = hash_secret(new_password)?;
    match db.complete_password_reset(ticket.reset_id, &ticket.user_id, &hash)? {
        ResetCompletion::Completed => {}
        ResetCompletion::AlreadyUsed => return Err(AuthError::TokenUsed),
        ResetCompletion::UnknownUser => return Err(AuthError::InvalidToken),
    }
    tracing::info!(user_id = %ticket.user_id, "password reset completed");
    Ok(())
}
