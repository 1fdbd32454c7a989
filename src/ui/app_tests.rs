#![allow(clippy::unwrap_used)]

use super::app::*;
use super::commands::{go_to, handle_command};
use crate::catalog::{CatalogOrigin, UNKNOWN_PARENT};
use crate::config::Settings;
use crate::db::Database;
use crate::models::{CatalogItem, LinePatch, Unit, User};
use crate::session::{Action, Step, WizardState};
use rust_decimal_macros::dec;

fn entry(id: &str, code: i64, chapter: &str, name: &str) -> CatalogItem {
    CatalogItem::new(id, code, chapter, name, Unit::SquareMeter, dec!(100), dec!(200))
}

fn catalog() -> Vec<CatalogItem> {
    vec![
        entry("p12", 1200, "Contrapisos", "Contrapisos"),
        entry("c1", 1201, "Contrapisos", "Contrapiso 10 cm (cascotes)"),
        entry("c4", 1202, "Contrapisos", "Contrapiso armado"),
        entry("orphan", 1901, "Varios", "Limpieza de obra"),
    ]
}

fn setup() -> (App, Database) {
    let db = Database::open_in_memory().unwrap();
    let user = User::new("juan@x.com".into(), "hash".into(), Some("Juan".into()));
    db.insert_user(&user).unwrap();
    let app = App::new(
        user,
        Settings::default(),
        &catalog(),
        CatalogOrigin::Fallback,
        WizardState::fresh("0.10"),
    );
    (app, db)
}

fn item_row(app: &App, id: &str) -> CatalogItem {
    app.select_rows
        .iter()
        .find_map(|r| match r {
            SelectRow::Item(item) if item.id == id => Some(item.clone()),
            _ => None,
        })
        .unwrap()
}

// ── Screen / LineField ────────────────────────────────────────

#[test]
fn test_screen_steps_round_trip() {
    for step in [Step::Select, Step::Edit, Step::Review] {
        assert_eq!(Screen::for_step(step).step(), Some(step));
    }
    assert_eq!(Screen::Drafts.step(), None);
    assert_eq!(Screen::all().len(), 4);
}

#[test]
fn test_line_field_patch_blank_override_clears() {
    assert_eq!(
        LineField::Materials.patch("  "),
        LinePatch::materials_override(None)
    );
    assert_eq!(
        LineField::Labor.patch("1500"),
        LinePatch::labor_override(Some("1500".into()))
    );
    assert_eq!(LineField::Quantity.patch(" 12 "), LinePatch::quantity("12"));
}

// ── Selection list ────────────────────────────────────────────

#[test]
fn test_select_rows_include_orphans_under_unknown_chapter() {
    let (app, _db) = setup();
    assert_eq!(app.selected_item_count(), 3);
    let chapters: Vec<&str> = app
        .select_rows
        .iter()
        .filter_map(|r| match r {
            SelectRow::Chapter { label, .. } => Some(label.as_str()),
            SelectRow::Item(_) => None,
        })
        .collect();
    assert_eq!(chapters, vec!["Contrapisos", UNKNOWN_PARENT]);
}

#[test]
fn test_search_narrows_rows() {
    let (mut app, _db) = setup();
    app.search_input = "armado".into();
    app.refresh_select_rows();
    assert_eq!(app.selected_item_count(), 1);
    assert_eq!(item_row(&app, "c4").name, "Contrapiso armado");
}

#[test]
fn test_search_without_match_clamps_cursor() {
    let (mut app, _db) = setup();
    app.select_index = 4;
    app.search_input = "zzz".into();
    app.refresh_select_rows();
    assert!(app.select_rows.is_empty());
    assert_eq!(app.select_index, 0);
}

// ── Navigation gates ──────────────────────────────────────────

#[test]
fn test_go_to_edit_requires_selection() {
    let (mut app, db) = setup();
    go_to(&mut app, &db, Screen::Edit).unwrap();
    assert_eq!(app.screen, Screen::Select);
    assert_eq!(app.state().step, Step::Select);

    let item = item_row(&app, "c1");
    app.dispatch(Action::ToggleSelect(item));
    go_to(&mut app, &db, Screen::Edit).unwrap();
    assert_eq!(app.screen, Screen::Edit);
    assert_eq!(app.state().step, Step::Edit);
}

#[test]
fn test_go_to_review_requires_quantities() {
    let (mut app, db) = setup();
    let item = item_row(&app, "c1");
    app.dispatch(Action::ToggleSelect(item));
    go_to(&mut app, &db, Screen::Review).unwrap();
    assert_eq!(app.screen, Screen::Select);

    app.dispatch(Action::SetLine {
        item_id: "c1".into(),
        patch: LinePatch::quantity("3"),
    });
    go_to(&mut app, &db, Screen::Review).unwrap();
    assert_eq!(app.screen, Screen::Review);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn test_markup_command_accepts_percent() {
    let (mut app, mut db) = setup();
    handle_command("markup 15%", &mut app, &mut db).unwrap();
    assert_eq!(app.state().draft.markup, "0.15");
    assert_eq!(app.status_message, "Ajuste de obra: 15%");
}

#[test]
fn test_materials_command_toggles_and_parses() {
    let (mut app, mut db) = setup();
    handle_command("materials", &mut app, &mut db).unwrap();
    assert!(!app.state().include_materials);
    handle_command("materials on", &mut app, &mut db).unwrap();
    assert!(app.state().include_materials);
    handle_command("materials quizás", &mut app, &mut db).unwrap();
    assert!(app.state().include_materials);
}

#[test]
fn test_save_requires_name_then_creates_and_updates() {
    let (mut app, mut db) = setup();
    let item = item_row(&app, "c1");
    app.dispatch(Action::ToggleSelect(item));

    handle_command("save", &mut app, &mut db).unwrap();
    assert!(app.drafts.is_empty());
    assert!(app.state().draft_id.is_none());

    handle_command("save Cocina", &mut app, &mut db).unwrap();
    assert_eq!(app.drafts.len(), 1);
    assert_eq!(app.status_message, "Borrador creado: Cocina");
    let id = app.state().draft_id.clone().unwrap();

    app.dispatch(Action::SetMarkup("0.2".into()));
    handle_command("w", &mut app, &mut db).unwrap();
    assert_eq!(app.status_message, "Borrador actualizado: Cocina");
    assert_eq!(app.drafts.len(), 1);
    assert_eq!(app.drafts[0].id, id);
    assert_eq!(app.drafts[0].draft.markup, "0.2");
}

#[test]
fn test_delete_draft_command_asks_for_confirmation() {
    let (mut app, mut db) = setup();
    let item = item_row(&app, "c1");
    app.dispatch(Action::ToggleSelect(item));
    handle_command("save Cocina", &mut app, &mut db).unwrap();

    handle_command("delete-draft", &mut app, &mut db).unwrap();
    assert!(app.pending_action.is_none());

    handle_command("drafts", &mut app, &mut db).unwrap();
    handle_command("delete-draft", &mut app, &mut db).unwrap();
    assert_eq!(app.input_mode, InputMode::Confirm);
    assert!(matches!(
        app.pending_action,
        Some(PendingAction::DeleteDraft { ref name, .. }) if name == "Cocina"
    ));
}

#[test]
fn test_unknown_command_suggests_closest() {
    let (mut app, mut db) = setup();
    handle_command("marup 0.1", &mut app, &mut db).unwrap();
    assert!(app.status_message.contains(":markup"));
}

#[test]
fn test_search_command_moves_to_select() {
    let (mut app, mut db) = setup();
    app.screen = Screen::Drafts;
    handle_command("search armado", &mut app, &mut db).unwrap();
    assert_eq!(app.screen, Screen::Select);
    assert_eq!(app.selected_item_count(), 1);
}
