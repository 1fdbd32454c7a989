use regex::Regex;
use std::sync::LazyLock;

use super::BudgetDraft;

static ISO_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteTitle {
    #[default]
    Construction,
    Remodeling,
    Maintenance,
}

impl QuoteTitle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Construction => "Presupuesto de obra",
            Self::Remodeling => "Remodelación",
            Self::Maintenance => "Mantenimiento",
        }
    }

    /// Exact label match; anything else yields `None`.
    pub fn from_label(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.as_str() == s)
    }

    pub fn all() -> &'static [QuoteTitle] {
        &[Self::Construction, Self::Remodeling, Self::Maintenance]
    }
}

impl std::fmt::Display for QuoteTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw header fields as the user typed them.
#[derive(Debug, Clone, Default)]
pub struct HeaderInput {
    pub title: Option<String>,
    /// Format: "YYYY-MM-DD"
    pub date: Option<String>,
    pub client: Option<String>,
    pub address: Option<String>,
    pub time_estimate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteHeader {
    pub title: QuoteTitle,
    /// Format: "DD/MM/YYYY"
    pub date: String,
    pub client: String,
    pub address: String,
    pub time_estimate: String,
}

impl QuoteHeader {
    pub fn from_input(input: &HeaderInput) -> Self {
        Self {
            title: input
                .title
                .as_deref()
                .and_then(QuoteTitle::from_label)
                .unwrap_or_default(),
            date: display_date(input.date.as_deref()),
            client: input.client.clone().unwrap_or_default(),
            address: input.address.clone().unwrap_or_default(),
            time_estimate: input.time_estimate.clone().unwrap_or_default(),
        }
    }
}

impl Default for QuoteHeader {
    fn default() -> Self {
        Self::from_input(&HeaderInput::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFooter {
    pub issuer: String,
    pub address: String,
    pub contact: String,
}

/// `YYYY-MM-DD` becomes `DD/MM/YYYY`; anything else falls back to today.
pub fn display_date(input: Option<&str>) -> String {
    if let Some(s) = input {
        let is_iso = ISO_DATE.as_ref().is_some_and(|re| re.is_match(s));
        if is_iso {
            let mut parts = s.split('-');
            if let (Some(y), Some(m), Some(d)) = (parts.next(), parts.next(), parts.next()) {
                return format!("{d}/{m}/{y}");
            }
        }
    }
    chrono::Local::now().format("%d/%m/%Y").to_string()
}

/// A named draft snapshot as handed to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedDraft {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    pub include_materials: bool,
    pub draft: BudgetDraft,
}

impl SavedDraft {
    /// A snapshot whose timestamps match has never been written before.
    pub fn is_new(&self) -> bool {
        self.created_at == self.updated_at
    }
}
