use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::paths::Paths;
use crate::models::DEFAULT_MARKUP;
use crate::pricing::coerce_decimal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schema_version: u32,
    /// CSV feed: a local path or an http(s) URL. None uses the built-in catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_source: Option<String>,
    /// Markup for a fresh wizard session, as a fraction ("0.10" = 10%).
    pub default_markup: String,
    pub reset_ttl_minutes: i64,
    /// Public base URL used in reset links and payment callbacks.
    pub app_url: String,
    /// Monthly subscription price in ARS.
    pub subscription_price: Decimal,
    pub subscription_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mp_access_token: Option<String>,
    pub email_from: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: 1,
            catalog_source: None,
            default_markup: DEFAULT_MARKUP.to_string(),
            reset_ttl_minutes: 60,
            app_url: "http://localhost:3000".to_string(),
            subscription_price: Decimal::ZERO,
            subscription_reason: "Suscripción Metro Cuadrado".to_string(),
            mp_access_token: None,
            email_from: "no-reply@metrocuadrado.com".to_string(),
        }
    }
}

impl Settings {
    /// Read `config.json` if it exists, then apply environment overrides.
    pub fn load(paths: &Paths) -> Result<Self> {
        let path = paths.settings_file();
        let mut settings = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings file: {}", path.display()))?
        } else {
            Settings::default()
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn save(&self, paths: &Paths) -> Result<()> {
        paths.ensure_directories()?;
        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        let path = paths.settings_file();
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))
    }

    /// Overlay values from `lookup` (normally the process environment).
    /// Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OBRATUI_CATALOG_CSV") {
            self.catalog_source = Some(v);
        }
        if let Some(v) = get("OBRATUI_APP_URL") {
            self.app_url = v;
        }
        if let Some(v) = get("OBRATUI_SUBSCRIPTION_PRICE") {
            self.subscription_price = coerce_decimal(&v);
        }
        if let Some(v) = get("MP_ACCESS_TOKEN") {
            self.mp_access_token = Some(v);
        }
    }
}
