use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::CatalogItem;
use crate::pricing::coerce_decimal;

pub const DEFAULT_MARKUP: &str = "0.10";

/// User input for one selected catalog item. Every numeric field is free text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DraftLine {
    pub item_id: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labor_override: Option<String>,
}

impl DraftLine {
    pub fn blank(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            ..Default::default()
        }
    }

    pub fn apply(&mut self, patch: &LinePatch) {
        if let Some(q) = &patch.quantity {
            self.quantity = q.clone();
        }
        if let Some(m) = &patch.materials_override {
            self.materials_override = m.clone();
        }
        if let Some(l) = &patch.labor_override {
            self.labor_override = l.clone();
        }
    }
}

/// Partial update for a [`DraftLine`]. `None` leaves the field untouched;
/// `Some(None)` clears an override.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinePatch {
    pub quantity: Option<String>,
    pub materials_override: Option<Option<String>>,
    pub labor_override: Option<Option<String>>,
}

impl LinePatch {
    pub fn quantity(value: impl Into<String>) -> Self {
        Self {
            quantity: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn materials_override(value: Option<String>) -> Self {
        Self {
            materials_override: Some(value),
            ..Default::default()
        }
    }

    pub fn labor_override(value: Option<String>) -> Self {
        Self {
            labor_override: Some(value),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetDraft {
    /// Selected items, always kept in ascending code order.
    #[serde(default)]
    pub selected: Vec<CatalogItem>,
    /// Keyed by item id; keys match `selected`.
    #[serde(default)]
    pub lines: BTreeMap<String, DraftLine>,
    /// Fractional rate as typed by the user ("0.10" = 10%).
    #[serde(default)]
    pub markup: String,
}

impl Default for BudgetDraft {
    fn default() -> Self {
        Self::new(DEFAULT_MARKUP)
    }
}

impl BudgetDraft {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            selected: Vec::new(),
            lines: BTreeMap::new(),
            markup: markup.into(),
        }
    }

    pub fn is_selected(&self, item_id: &str) -> bool {
        self.selected.iter().any(|i| i.id == item_id)
    }

    pub fn line(&self, item_id: &str) -> Option<&DraftLine> {
        self.lines.get(item_id)
    }

    pub fn selected_ids(&self) -> Vec<&str> {
        self.selected.iter().map(|i| i.id.as_str()).collect()
    }

    /// Select an item. A blank line is created if none exists.
    pub fn select(&mut self, item: &CatalogItem) {
        if !self.is_selected(&item.id) {
            self.selected.push(item.clone());
            CatalogItem::sort_by_code(&mut self.selected);
        }
        self.lines
            .entry(item.id.clone())
            .or_insert_with(|| DraftLine::blank(item.id.clone()));
    }

    /// Deselect an item and drop its line. Re-selecting starts from a blank line.
    pub fn deselect(&mut self, item_id: &str) {
        self.selected.retain(|i| i.id != item_id);
        self.lines.remove(item_id);
    }

    /// Returns true if the item ended up selected.
    pub fn toggle(&mut self, item: &CatalogItem) -> bool {
        if self.is_selected(&item.id) {
            self.deselect(&item.id);
            false
        } else {
            self.select(item);
            true
        }
    }

    /// Merge `patch` into the line of a selected item, creating a blank line
    /// first if it is missing. Unselected ids are left alone and get no line,
    /// so `lines` never holds a key absent from `selected`. That rule wins over
    /// creating a line: the call returns `false` and changes nothing.
    pub fn set_line_patch(&mut self, item_id: &str, patch: &LinePatch) -> bool {
        if !self.is_selected(item_id) {
            return false;
        }
        self.lines
            .entry(item_id.to_string())
            .or_insert_with(|| DraftLine::blank(item_id))
            .apply(patch);
        true
    }

    pub fn set_markup(&mut self, value: impl Into<String>) {
        self.markup = value.into();
    }

    pub fn can_edit(&self) -> bool {
        !self.selected.is_empty()
    }

    /// Every selected item needs a positive quantity before review.
    pub fn can_review(&self) -> bool {
        self.can_edit()
            && self.selected.iter().all(|item| {
                self.lines
                    .get(&item.id)
                    .is_some_and(|l| coerce_decimal(&l.quantity) > Decimal::ZERO)
            })
    }
}
