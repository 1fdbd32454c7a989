use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::{BillingError, BillingResult, PaymentProvider, Preapproval, PreapprovalLink, PreapprovalRequest};
use crate::config::Settings;

pub const API_BASE: &str = "https://api.mercadopago.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// MercadoPago preapproval (recurring payment) client.
pub struct MercadoPago {
    client: Client,
    base_url: String,
    access_token: String,
}

impl MercadoPago {
    pub fn new(access_token: impl Into<String>, base_url: impl Into<String>) -> BillingResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BillingError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> BillingResult<Self> {
        let token = settings
            .mp_access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BillingError::NotConfigured("MP_ACCESS_TOKEN is not set".into()))?;
        Self::new(token, API_BASE)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> BillingResult<T> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|e| BillingError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BillingError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .map_err(|e| BillingError::Transport(format!("invalid response body: {e}")))
    }
}

impl PaymentProvider for MercadoPago {
    fn create_preapproval(&self, request: &PreapprovalRequest) -> BillingResult<PreapprovalLink> {
        let url = format!("{}/preapproval", self.base_url);
        self.send(self.client.post(url).json(request))
    }

    fn get_preapproval(&self, id: &str) -> BillingResult<Preapproval> {
        let url = format!("{}/preapproval/{id}", self.base_url);
        self.send(self.client.get(url))
    }
}
