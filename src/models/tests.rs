#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;

use super::*;

fn item(id: &str, code: i64) -> CatalogItem {
    CatalogItem::new(
        id,
        code,
        "Contrapisos",
        format!("Item {code}"),
        Unit::SquareMeter,
        dec!(20000),
        dec!(28000),
    )
}

// ── Unit ──────────────────────────────────────────────────────

#[test]
fn test_unit_parse() {
    assert_eq!(Unit::parse("m2"), Unit::SquareMeter);
    assert_eq!(Unit::parse("M2"), Unit::SquareMeter);
    assert_eq!(Unit::parse("m²"), Unit::SquareMeter);
    assert_eq!(Unit::parse("m3"), Unit::CubicMeter);
    assert_eq!(Unit::parse("ml"), Unit::LinearMeter);
    assert_eq!(Unit::parse("u"), Unit::Each);
    assert_eq!(Unit::parse("kg"), Unit::Each);
    assert_eq!(Unit::parse(""), Unit::Each);
}

#[test]
fn test_unit_roundtrip() {
    for u in Unit::all() {
        assert_eq!(Unit::parse(u.as_str()), *u, "Roundtrip failed for {u}");
    }
}

#[test]
fn test_unit_serde_uses_feed_codes() {
    let json = serde_json::to_string(&Unit::LinearMeter).unwrap();
    assert_eq!(json, "\"ml\"");
    let back: Unit = serde_json::from_str("\"m3\"").unwrap();
    assert_eq!(back, Unit::CubicMeter);
}

// ── CatalogItem ───────────────────────────────────────────────

#[test]
fn test_chapter_detection() {
    assert!(item("a", 1200).is_chapter());
    assert!(!item("b", 1201).is_chapter());
    assert!(item("c", 0).is_chapter());
}

#[test]
fn test_chapter_code() {
    assert_eq!(item("a", 1201).chapter_code(), 1200);
    assert_eq!(item("b", 1299).chapter_code(), 1200);
    assert_eq!(item("c", 1200).chapter_code(), 1200);
    assert_eq!(item("d", 12).chapter_code(), 0);
}

// ── BudgetDraft ───────────────────────────────────────────────

#[test]
fn test_new_draft_defaults() {
    let draft = BudgetDraft::default();
    assert!(draft.selected.is_empty());
    assert!(draft.lines.is_empty());
    assert_eq!(draft.markup, "0.10");
    assert!(!draft.can_edit());
    assert!(!draft.can_review());
}

#[test]
fn test_select_creates_blank_line() {
    let mut draft = BudgetDraft::default();
    draft.select(&item("a", 1201));
    assert!(draft.is_selected("a"));
    let line = draft.line("a").unwrap();
    assert_eq!(line.item_id, "a");
    assert!(line.quantity.is_empty());
    assert!(line.materials_override.is_none());
    assert!(line.labor_override.is_none());
}

#[test]
fn test_selection_sorted_by_code() {
    let mut draft = BudgetDraft::default();
    draft.select(&item("c", 1905));
    draft.select(&item("a", 1201));
    draft.select(&item("b", 1601));
    assert_eq!(draft.selected_ids(), vec!["a", "b", "c"]);
}

#[test]
fn test_select_twice_is_idempotent() {
    let mut draft = BudgetDraft::default();
    let it = item("a", 1201);
    draft.select(&it);
    draft.set_line_patch("a", &LinePatch::quantity("4"));
    draft.select(&it);
    assert_eq!(draft.selected.len(), 1);
    assert_eq!(draft.line("a").unwrap().quantity, "4");
}

#[test]
fn test_lines_keys_match_selection() {
    let mut draft = BudgetDraft::default();
    draft.select(&item("a", 1201));
    draft.select(&item("b", 1202));
    draft.deselect("a");
    let keys: Vec<&str> = draft.lines.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, draft.selected_ids());
}

#[test]
fn test_reselect_discards_previous_input() {
    let mut draft = BudgetDraft::default();
    let it = item("x", 1201);
    draft.select(&it);
    draft.set_line_patch(
        "x",
        &LinePatch {
            quantity: Some("10".into()),
            materials_override: Some(Some("5".into())),
            labor_override: None,
        },
    );
    draft.deselect("x");
    assert!(draft.line("x").is_none());

    draft.select(&it);
    let line = draft.line("x").unwrap();
    assert!(line.quantity.is_empty());
    assert!(line.materials_override.is_none());
}

#[test]
fn test_toggle() {
    let mut draft = BudgetDraft::default();
    let it = item("a", 1201);
    assert!(draft.toggle(&it));
    assert!(draft.is_selected("a"));
    assert!(!draft.toggle(&it));
    assert!(!draft.is_selected("a"));
    assert!(draft.lines.is_empty());
}

#[test]
fn test_patch_merges_only_given_fields() {
    let mut draft = BudgetDraft::default();
    draft.select(&item("a", 1201));
    draft.set_line_patch("a", &LinePatch::quantity("3"));
    draft.set_line_patch("a", &LinePatch::labor_override(Some("0".into())));
    let line = draft.line("a").unwrap();
    assert_eq!(line.quantity, "3");
    assert_eq!(line.labor_override.as_deref(), Some("0"));
    assert!(line.materials_override.is_none());

    draft.set_line_patch("a", &LinePatch::labor_override(None));
    assert!(draft.line("a").unwrap().labor_override.is_none());
    assert_eq!(draft.line("a").unwrap().quantity, "3");
}

#[test]
fn test_patch_recreates_missing_line_for_selected_item() {
    let mut draft = BudgetDraft::default();
    draft.select(&item("a", 1201));
    draft.lines.clear();
    assert!(draft.set_line_patch("a", &LinePatch::quantity("2")));
    assert_eq!(draft.line("a").unwrap().quantity, "2");
}

#[test]
fn test_patch_ignores_unselected_item() {
    let mut draft = BudgetDraft::default();
    assert!(!draft.set_line_patch("ghost", &LinePatch::quantity("2")));
    assert!(draft.lines.is_empty());
}

#[test]
fn test_patch_after_deselect_does_not_recreate_line() {
    let mut draft = BudgetDraft::default();
    draft.select(&item("a", 1201));
    draft.select(&item("b", 1202));
    draft.deselect("a");
    assert!(!draft.set_line_patch("a", &LinePatch::quantity("2")));
    assert!(draft.line("a").is_none());
    assert!(draft
        .lines
        .keys()
        .all(|id| draft.selected.iter().any(|it| &it.id == id)));
}

#[test]
fn test_can_review_requires_positive_quantities() {
    let mut draft = BudgetDraft::default();
    draft.select(&item("a", 1201));
    draft.select(&item("b", 1202));
    assert!(draft.can_edit());
    assert!(!draft.can_review());

    draft.set_line_patch("a", &LinePatch::quantity("2"));
    assert!(!draft.can_review());
    draft.set_line_patch("b", &LinePatch::quantity("abc"));
    assert!(!draft.can_review());
    draft.set_line_patch("b", &LinePatch::quantity("0.5"));
    assert!(draft.can_review());
}

#[test]
fn test_draft_line_missing_quantity_deserializes_blank() {
    let line: DraftLine = serde_json::from_str(r#"{"item_id":"a"}"#).unwrap();
    assert!(line.quantity.is_empty());
    assert!(line.materials_override.is_none());
}

// ── Role / User ───────────────────────────────────────────────

#[test]
fn test_role_parse() {
    assert_eq!(Role::parse("owner"), Role::Owner);
    assert_eq!(Role::parse("ADMIN"), Role::Admin);
    assert_eq!(Role::parse("user"), Role::User);
    assert_eq!(Role::parse("guest"), Role::Guest);
    assert_eq!(Role::parse("whatever"), Role::Guest);
}

#[test]
fn test_role_roundtrip() {
    for r in Role::all() {
        assert_eq!(Role::parse(r.as_str()), *r);
    }
}

#[test]
fn test_role_access() {
    assert!(Role::Owner.has_access());
    assert!(Role::Admin.has_access());
    assert!(Role::User.has_access());
    assert!(!Role::Guest.has_access());
}

#[test]
fn test_user_new_defaults() {
    let user = User::new("a@b.com".into(), "hash".into(), None);
    assert_eq!(user.role, Role::Guest);
    assert_eq!(user.name, "Usuario");
    assert!(!user.id.is_empty());
    assert_eq!(user.created_at, user.updated_at);
}

// ── Quote header ──────────────────────────────────────────────

#[test]
fn test_quote_title_from_label() {
    assert_eq!(
        QuoteTitle::from_label("Remodelación"),
        Some(QuoteTitle::Remodeling)
    );
    assert_eq!(QuoteTitle::from_label("Otra cosa"), None);
}

#[test]
fn test_header_invalid_title_falls_back() {
    let header = QuoteHeader::from_input(&HeaderInput {
        title: Some("Cualquiera".into()),
        ..Default::default()
    });
    assert_eq!(header.title, QuoteTitle::Construction);
}

#[test]
fn test_display_date_iso() {
    assert_eq!(display_date(Some("2025-03-09")), "09/03/2025");
}

#[test]
fn test_display_date_fallback_is_today() {
    let today = chrono::Local::now().format("%d/%m/%Y").to_string();
    assert_eq!(display_date(Some("9/3/2025")), today);
    assert_eq!(display_date(None), today);
}

#[test]
fn test_saved_draft_is_new() {
    let mut saved = SavedDraft {
        id: "d1".into(),
        user_id: "u1".into(),
        name: "Cocina".into(),
        created_at: "2025-01-01T00:00:00Z".into(),
        updated_at: "2025-01-01T00:00:00Z".into(),
        include_materials: true,
        draft: BudgetDraft::default(),
    };
    assert!(saved.is_new());
    saved.updated_at = "2025-01-02T00:00:00Z".into();
    assert!(!saved.is_new());
}
