use anyhow::Result;

use super::mask_email;

pub trait Mailer {
    fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<()>;
}

/// Development mailer: writes the reset link to the log instead of sending it.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

impl Mailer for LogMailer {
    fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<()> {
        tracing::info!(
            from = %self.from,
            to = %mask_email(to),
            reset_url,
            "password reset link"
        );
        Ok(())
    }
}
