use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::models::{CatalogItem, DraftLine};

/// Parse free-text numeric input. Blank or unparseable input is zero, and so
/// is anything outside the range `Decimal` can hold.
pub fn coerce_decimal(input: &str) -> Decimal {
    let s = input.trim();
    // `Decimal::from_str` tolerates digit separators like `1_000`
    if s.is_empty() || s.contains('_') {
        return Decimal::ZERO;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .unwrap_or(Decimal::ZERO)
}

// Arithmetic that leaves the `Decimal` range yields zero, the same as
// unparseable input.
fn mul_or_zero(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or(Decimal::ZERO)
}

fn add_or_zero(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or(Decimal::ZERO)
}

fn resolve_override(value: Option<&str>, fallback: Decimal) -> Decimal {
    match value {
        Some(v) if !v.is_empty() => coerce_decimal(v),
        _ => fallback,
    }
}

/// Unit prices for one line after applying any non-empty overrides.
pub fn effective_prices(item: &CatalogItem, line: &DraftLine) -> (Decimal, Decimal) {
    (
        resolve_override(line.materials_override.as_deref(), item.unit_price_materials),
        resolve_override(line.labor_override.as_deref(), item.unit_price_labor),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineBreakdown {
    pub quantity: Decimal,
    pub unit_materials: Decimal,
    pub unit_labor: Decimal,
    pub materials: Decimal,
    pub labor: Decimal,
    pub subtotal: Decimal,
}

pub fn line_breakdown(item: &CatalogItem, line: &DraftLine) -> LineBreakdown {
    let quantity = coerce_decimal(&line.quantity);
    let (unit_materials, unit_labor) = effective_prices(item, line);
    let materials = mul_or_zero(quantity, unit_materials);
    let labor = mul_or_zero(quantity, unit_labor);
    LineBreakdown {
        quantity,
        unit_materials,
        unit_labor,
        materials,
        labor,
        subtotal: add_or_zero(materials, labor),
    }
}

/// quantity × (materials + labor), at full precision.
pub fn line_subtotal(item: &CatalogItem, line: &DraftLine) -> Decimal {
    line_breakdown(item, line).subtotal
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub materials_total: Decimal,
    pub labor_total: Decimal,
    pub subtotal: Decimal,
    pub markup_rate: Decimal,
    pub total: Decimal,
}

impl Totals {
    fn from_parts(materials_total: Decimal, labor_total: Decimal, markup_rate: Decimal) -> Self {
        let subtotal = add_or_zero(materials_total, labor_total);
        Self {
            materials_total,
            labor_total,
            subtotal,
            markup_rate,
            total: mul_or_zero(subtotal, add_or_zero(Decimal::ONE, markup_rate)),
        }
    }

    /// Labor-only view: materials forced to zero, subtotal and total rederived.
    pub fn without_materials(&self) -> Self {
        Self::from_parts(Decimal::ZERO, self.labor_total, self.markup_rate)
    }

    pub fn with_materials(&self, include: bool) -> Self {
        if include {
            *self
        } else {
            self.without_materials()
        }
    }

    pub fn markup_amount(&self) -> Decimal {
        mul_or_zero(self.subtotal, self.markup_rate)
    }
}

/// Aggregate totals over `items`. Items without a line contribute nothing.
pub fn compute_totals(
    items: &[CatalogItem],
    lines: &BTreeMap<String, DraftLine>,
    markup: &str,
) -> Totals {
    let (materials, labor) = items
        .iter()
        .filter_map(|item| lines.get(&item.id).map(|line| line_breakdown(item, line)))
        .fold((Decimal::ZERO, Decimal::ZERO), |(m, l), b| {
            (add_or_zero(m, b.materials), add_or_zero(l, b.labor))
        });
    Totals::from_parts(materials, labor, coerce_decimal(markup))
}
