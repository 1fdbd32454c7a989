use std::collections::BTreeMap;

use crate::models::{CatalogItem, CHAPTER_STEP};

/// Label given to children whose chapter has no parent entry.
pub const UNKNOWN_PARENT: &str = "Desconocido";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPartition {
    /// Chapter entries, ascending by code.
    pub parents: Vec<CatalogItem>,
    /// Line items keyed by their chapter code, each bucket ascending by code.
    pub children_by_parent: BTreeMap<i64, Vec<CatalogItem>>,
}

impl CatalogPartition {
    pub fn children_of(&self, parent: &CatalogItem) -> &[CatalogItem] {
        self.children_by_parent
            .get(&parent.code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every child in display order: parent by parent, then buckets with no parent.
    pub fn children(&self) -> impl Iterator<Item = &CatalogItem> {
        self.children_by_parent.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty() && self.children_by_parent.is_empty()
    }
}

/// Split a flat catalog into chapters and their line items.
///
/// Every child lands in the bucket of `floor(code / 100) * 100` and carries
/// the chapter label of that parent in `parent_name`. Missing parents never
/// drop a child; it is labelled [`UNKNOWN_PARENT`] instead.
pub fn partition_parents_and_children(items: &[CatalogItem]) -> CatalogPartition {
    let mut parents: Vec<CatalogItem> = items.iter().filter(|i| i.is_chapter()).cloned().collect();
    CatalogItem::sort_by_code(&mut parents);

    let mut children_by_parent: BTreeMap<i64, Vec<CatalogItem>> = BTreeMap::new();
    for child in items.iter().filter(|i| !i.is_chapter()) {
        let base = child.chapter_code();
        let parent_name = parents
            .iter()
            .find(|p| p.code == base)
            .map(|p| p.chapter.clone())
            .unwrap_or_else(|| UNKNOWN_PARENT.to_string());
        let mut child = child.clone();
        child.parent_name = parent_name;
        children_by_parent.entry(base).or_default().push(child);
    }
    for bucket in children_by_parent.values_mut() {
        CatalogItem::sort_by_code(bucket);
    }

    CatalogPartition {
        parents,
        children_by_parent,
    }
}

fn matches(item: &CatalogItem, needle: &str) -> bool {
    item.name.to_lowercase().contains(needle)
        || item.chapter.to_lowercase().contains(needle)
        || item.code.to_string().contains(needle)
}

/// Case-insensitive search over name, chapter label and code.
///
/// A parent survives if it or any of its children match; its bucket keeps
/// only the matching children. A blank query returns the partition unchanged.
pub fn filter_by_search(partition: &CatalogPartition, query: &str) -> CatalogPartition {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return partition.clone();
    }

    let mut parents = Vec::new();
    let mut children_by_parent = BTreeMap::new();
    for parent in &partition.parents {
        let kids = partition.children_of(parent);
        if !(matches(parent, &needle) || kids.iter().any(|k| matches(k, &needle))) {
            continue;
        }
        let kept: Vec<CatalogItem> = kids
            .iter()
            .filter(|k| matches(k, &needle))
            .cloned()
            .collect();
        children_by_parent.insert(parent.code, kept);
        parents.push(parent.clone());
    }

    CatalogPartition {
        parents,
        children_by_parent,
    }
}

/// `code / 100` of the parent whose chapter label equals `parent_name`, or 0.
pub fn parent_display_code(parent_name: &str, parents: &[CatalogItem]) -> i64 {
    parents
        .iter()
        .find(|p| p.chapter == parent_name)
        .map(|p| p.code / CHAPTER_STEP)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "grouping_tests.rs"]
mod tests;
