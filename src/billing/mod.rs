mod mercadopago;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;
use crate::db::Database;
use crate::models::{Role, Subscription, User};

pub use mercadopago::MercadoPago;

pub const NOTIFICATION_KIND: &str = "preapproval";
const STATUS_AUTHORIZED: &str = "authorized";

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Billing is not configured: {0}")]
    NotConfigured(String),

    #[error("Payment provider error {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Payment provider unreachable: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for BillingError {
    fn from(e: anyhow::Error) -> Self {
        BillingError::Storage(format!("{e:#}"))
    }
}

pub type BillingResult<T> = Result<T, BillingError>;

// ── Provider payloads ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoRecurring {
    pub frequency: u32,
    pub frequency_type: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub transaction_amount: Decimal,
    pub currency_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreapprovalRequest {
    pub payer_email: String,
    pub reason: String,
    pub back_url: String,
    /// Identifies the payer when the provider omits the email.
    pub external_reference: String,
    pub auto_recurring: AutoRecurring,
    pub status: String,
    pub notification_url: String,
}

impl PreapprovalRequest {
    /// Monthly ARS subscription for `email`, returning to the wizard.
    pub fn monthly(settings: &Settings, email: &str) -> Self {
        let base = settings.app_url.trim_end_matches('/');
        Self {
            payer_email: email.to_string(),
            reason: settings.subscription_reason.clone(),
            back_url: format!("{base}/wizard"),
            external_reference: email.to_string(),
            auto_recurring: AutoRecurring {
                frequency: 1,
                frequency_type: "months".into(),
                transaction_amount: settings.subscription_price,
                currency_id: "ARS".into(),
            },
            status: "pending".into(),
            notification_url: format!("{base}/api/mp/webhook"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreapprovalLink {
    pub id: String,
    pub init_point: String,
    #[serde(default)]
    pub sandbox_init_point: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Payer {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Preapproval {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub payer_email: Option<String>,
    #[serde(default)]
    pub payer: Option<Payer>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

impl Preapproval {
    /// First non-blank of `payer_email`, `payer.email`, `external_reference`.
    pub fn resolved_email(&self) -> Option<String> {
        let payer = self.payer.as_ref().and_then(|p| p.email.as_deref());
        [self.payer_email.as_deref(), payer, self.external_reference.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|e| !e.is_empty())
            .map(str::to_lowercase)
    }

    pub fn is_authorized(&self) -> bool {
        self.status == STATUS_AUTHORIZED
    }
}

pub trait PaymentProvider {
    fn create_preapproval(&self, request: &PreapprovalRequest) -> BillingResult<PreapprovalLink>;
    fn get_preapproval(&self, id: &str) -> BillingResult<Preapproval>;
}

// ── Operations ────────────────────────────────────────────────

/// Create a pending monthly subscription and return the checkout URL.
pub fn start_subscription(
    provider: &dyn PaymentProvider,
    settings: &Settings,
    email: &str,
) -> BillingResult<String> {
    if settings.subscription_price <= Decimal::ZERO {
        return Err(BillingError::NotConfigured(
            "subscription price must be greater than zero".into(),
        ));
    }
    let request = PreapprovalRequest::monthly(settings, email);
    let link = provider.create_preapproval(&request)?;
    tracing::info!(preapproval_id = %link.id, "subscription checkout created");
    Ok(link.init_point)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Ignored,
    Activated { email: String },
    Unchanged { status: String },
}

/// Process a provider notification of `kind` for preapproval `id`.
pub(crate) fn handle_notification(
    db: &Database,
    provider: &dyn PaymentProvider,
    kind: &str,
    id: Option<&str>,
) -> BillingResult<NotificationOutcome> {
    let id = match id.map(str::trim) {
        Some(id) if kind == NOTIFICATION_KIND && !id.is_empty() => id,
        _ => {
            tracing::debug!(kind, "notification ignored");
            return Ok(NotificationOutcome::Ignored);
        }
    };

    let pre = provider.get_preapproval(id)?;
    let Some(email) = pre.resolved_email() else {
        tracing::warn!(preapproval_id = %pre.id, status = %pre.status, "preapproval without payer email");
        return Ok(NotificationOutcome::Unchanged { status: pre.status });
    };

    db.upsert_subscription(&Subscription {
        preapproval_id: pre.id.clone(),
        user_email: email.clone(),
        status: pre.status.clone(),
        updated_at: chrono::Utc::now().to_rfc3339(),
    })?;

    if !pre.is_authorized() {
        tracing::info!(preapproval_id = %pre.id, status = %pre.status, "subscription not authorized");
        return Ok(NotificationOutcome::Unchanged { status: pre.status });
    }

    // Staff roles already have access and are never downgraded.
    match db.get_user_by_email(&email)? {
        Some(user) if user.role == Role::Guest => {
            db.set_user_role_by_email(&email, Role::User)?;
            tracing::info!(user_id = %user.id, "subscription activated");
            Ok(NotificationOutcome::Activated { email })
        }
        Some(_) => Ok(NotificationOutcome::Activated { email }),
        None => {
            tracing::warn!(preapproval_id = %pre.id, "authorized subscription for unknown user");
            Ok(NotificationOutcome::Unchanged { status: pre.status })
        }
    }
}

/// Whether `user` may use the wizard and exports.
pub fn has_access(user: &User) -> bool {
    user.role.has_access()
}
