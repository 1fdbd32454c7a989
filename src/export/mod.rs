pub mod csv;
pub mod pdf;

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

use crate::models::{CatalogItem, DraftLine, QuoteFooter, QuoteHeader, Unit};
use crate::pricing::{compute_totals, line_breakdown, Totals};

pub use self::csv::write_csv;
pub use pdf::write_pdf;

/// Group label for items without a parent chapter name.
pub const OTHER_GROUP: &str = "Otros";

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
    pub item_id: String,
    pub code: i64,
    pub name: String,
    /// As typed; "0" when blank.
    pub quantity: String,
    pub unit: Unit,
    pub materials: Decimal,
    pub labor: Decimal,
    /// Labor only when materials are excluded.
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteGroup {
    pub name: String,
    pub rows: Vec<QuoteRow>,
    pub subtotal: Decimal,
}

/// Everything a renderer needs, already priced.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteDocument {
    pub header: QuoteHeader,
    pub footer: QuoteFooter,
    pub include_materials: bool,
    pub groups: Vec<QuoteGroup>,
    pub totals: Totals,
}

impl QuoteDocument {
    pub fn build(
        items: &[CatalogItem],
        lines: &BTreeMap<String, DraftLine>,
        markup: &str,
        include_materials: bool,
        header: QuoteHeader,
        footer: QuoteFooter,
    ) -> Self {
        let chosen: Vec<CatalogItem> = items
            .iter()
            .filter(|it| lines.contains_key(&it.id))
            .cloned()
            .collect();

        // Group by parent name, keeping first-appearance order
        let mut order: Vec<String> = Vec::new();
        let mut buckets: BTreeMap<String, Vec<CatalogItem>> = BTreeMap::new();
        for item in &chosen {
            let key = if item.parent_name.trim().is_empty() {
                OTHER_GROUP.to_string()
            } else {
                item.parent_name.clone()
            };
            if !buckets.contains_key(&key) {
                order.push(key.clone());
            }
            buckets.entry(key).or_default().push(item.clone());
        }

        let groups = order
            .into_iter()
            .filter_map(|name| {
                let members = buckets.remove(&name)?;
                let subtotal = compute_totals(&members, lines, "0")
                    .with_materials(include_materials)
                    .subtotal;
                let rows = members
                    .iter()
                    .filter_map(|item| {
                        let line = lines.get(&item.id)?;
                        Some(quote_row(item, line, include_materials))
                    })
                    .collect();
                Some(QuoteGroup {
                    name,
                    rows,
                    subtotal,
                })
            })
            .collect();

        Self {
            header,
            footer,
            include_materials,
            groups,
            totals: compute_totals(&chosen, lines, markup).with_materials(include_materials),
        }
    }

    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }

    /// `<title>-<client>-<date>` slug used for default export file names.
    pub fn file_stem(&self) -> String {
        let client = if self.header.client.trim().is_empty() {
            "cliente"
        } else {
            self.header.client.trim()
        };
        let raw = format!("{}-{}-{}", self.header.title, client, self.header.date);
        let slug: String = raw
            .to_lowercase()
            .chars()
            .map(|c| if c.is_whitespace() { '-' } else { c })
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
            .collect();
        if slug.is_empty() {
            "presupuesto".to_string()
        } else {
            slug
        }
    }
}

fn quote_row(item: &CatalogItem, line: &DraftLine, include_materials: bool) -> QuoteRow {
    let b = line_breakdown(item, line);
    let quantity = line.quantity.trim();
    QuoteRow {
        item_id: item.id.clone(),
        code: item.code,
        name: item.name.clone(),
        quantity: if quantity.is_empty() {
            "0".to_string()
        } else {
            quantity.to_string()
        },
        unit: item.unit,
        materials: b.materials,
        labor: b.labor,
        subtotal: if include_materials { b.subtotal } else { b.labor },
    }
}

// ── Display formatting ────────────────────────────────────────

/// Whole pesos with `.` thousands separators: `$ 528.000`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-$ {grouped}")
    } else {
        format!("$ {grouped}")
    }
}

/// Markup fraction as a whole percentage: `0.1` becomes `10%`. A rate too
/// large to scale prints as `0%`, matching how totals treat overflow.
pub fn format_rate(rate: Decimal) -> String {
    let pct = rate
        .checked_mul(Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    format!("{pct}%")
}

#[cfg(test)]
mod tests;
