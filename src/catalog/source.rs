use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::fallback::fallback_items;
use crate::config::Settings;
use crate::models::{CatalogItem, Unit};
use crate::pricing::coerce_decimal;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the loaded catalog actually came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOrigin {
    Fallback,
    File(PathBuf),
    Remote(String),
}

impl std::fmt::Display for CatalogOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fallback => write!(f, "built-in catalog"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

pub struct CatalogSource;

impl CatalogSource {
    /// Load the configured catalog. Never fails: any error falls back to the
    /// built-in list and is logged.
    pub fn load(settings: &Settings) -> (Vec<CatalogItem>, CatalogOrigin) {
        let Some(source) = settings
            .catalog_source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            tracing::info!("no catalog source configured, using built-in catalog");
            return (fallback_items(), CatalogOrigin::Fallback);
        };

        let (result, origin) = if is_url(source) {
            (Self::fetch(source), CatalogOrigin::Remote(source.to_string()))
        } else {
            let path = PathBuf::from(source);
            (Self::from_path(&path), CatalogOrigin::File(path))
        };

        match result {
            Ok(items) if !items.is_empty() => {
                tracing::info!(%origin, count = items.len(), "catalog loaded");
                (items, origin)
            }
            Ok(_) => {
                tracing::warn!(%origin, "catalog source is empty, using built-in catalog");
                (fallback_items(), CatalogOrigin::Fallback)
            }
            Err(e) => {
                tracing::warn!(%origin, error = %format!("{e:#}"), "catalog source failed, using built-in catalog");
                (fallback_items(), CatalogOrigin::Fallback)
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Vec<CatalogItem>> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open catalog file: {}", path.display()))?;
        Self::parse(file)
    }

    pub fn fetch(url: &str) -> Result<Vec<CatalogItem>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let body = client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch catalog: {url}"))?
            .error_for_status()
            .context("Catalog feed returned an error status")?
            .text()
            .context("Failed to read catalog feed body")?;
        Self::parse(body.as_bytes())
    }

    /// Parse a headed CSV feed. Columns are matched by name, case-insensitively.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<CatalogItem>> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: HashMap<String, usize> = rdr
            .headers()
            .context("Failed to read catalog header row")?
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        if !headers.contains_key("code") || !headers.contains_key("name") {
            anyhow::bail!("Catalog feed must have at least 'code' and 'name' columns");
        }

        let mut items = Vec::new();
        for (index, result) in rdr.records().enumerate() {
            let record = result
                .with_context(|| format!("Failed to read catalog row {}", index + 1))?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            items.push(row_to_item(index, &record, &headers));
        }
        Ok(items)
    }
}

fn cell<'r>(record: &'r csv::StringRecord, headers: &HashMap<String, usize>, name: &str) -> &'r str {
    headers
        .get(name)
        .and_then(|&i| record.get(i))
        .unwrap_or("")
}

fn row_to_item(
    index: usize,
    record: &csv::StringRecord,
    headers: &HashMap<String, usize>,
) -> CatalogItem {
    let field = |name: &str| cell(record, headers, name);
    let id = match field("id") {
        "" => format!("row-{index}"),
        id => id.to_string(),
    };
    let code = coerce_decimal(field("code")).trunc().to_i64().unwrap_or(0);
    CatalogItem::new(
        id,
        code,
        field("chapter"),
        field("name"),
        Unit::parse(field("unit")),
        coerce_decimal(field("pu_materials")),
        coerce_decimal(field("pu_labor")),
    )
}

fn is_url(source: &str) -> bool {
    let lower = source.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
