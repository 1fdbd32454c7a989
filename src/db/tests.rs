#![allow(clippy::unwrap_used)]

use super::*;
use rust_decimal_macros::dec;

fn make_user(email: &str) -> User {
    User::new(email.into(), "hash".into(), Some("Juan".into()))
}

fn item(id: &str, code: i64) -> CatalogItem {
    let mut it = CatalogItem::new(
        id,
        code,
        "Contrapisos",
        format!("Item {code}"),
        Unit::SquareMeter,
        dec!(20000.50),
        dec!(28000),
    );
    it.parent_name = "Contrapisos".into();
    it
}

fn make_draft(user_id: &str, name: &str, ts: &str) -> SavedDraft {
    let mut draft = BudgetDraft::new("0.15");
    draft.select(&item("a", 1201));
    draft.select(&item("b", 1202));
    draft.set_line_patch(
        "a",
        &LinePatch {
            quantity: Some("10".into()),
            materials_override: Some(Some("0".into())),
            labor_override: None,
        },
    );
    SavedDraft {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.into(),
        name: name.into(),
        created_at: ts.into(),
        updated_at: ts.into(),
        include_materials: true,
        draft,
    }
}

// ── Schema ────────────────────────────────────────────────────

#[test]
fn test_schema_version_recorded() {
    let db = Database::open_in_memory().unwrap();
    let version: i32 = db
        .conn
        .query_row("SELECT version FROM schema_version", [], |r| r.get(0))
        .unwrap();
    assert_eq!(version, schema::CURRENT_VERSION);
}

#[test]
fn test_reopen_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("obratui.db");
    {
        let db = Database::open(&path).unwrap();
        db.insert_user(&make_user("a@b.com")).unwrap();
    }
    let db = Database::open(&path).unwrap();
    assert!(db.get_user_by_email("a@b.com").unwrap().is_some());
}

// ── Users ─────────────────────────────────────────────────────

#[test]
fn test_user_crud() {
    let db = Database::open_in_memory().unwrap();
    let user = make_user("juan@x.com");
    db.insert_user(&user).unwrap();

    assert_eq!(db.get_user_by_email("juan@x.com").unwrap(), Some(user.clone()));
    assert_eq!(db.get_user_by_id(&user.id).unwrap(), Some(user.clone()));
    assert!(db.get_user_by_email("nadie@x.com").unwrap().is_none());
}

#[test]
fn test_duplicate_email_rejected() {
    let db = Database::open_in_memory().unwrap();
    db.insert_user(&make_user("juan@x.com")).unwrap();
    assert!(db.insert_user(&make_user("juan@x.com")).is_err());
}

#[test]
fn test_set_role_by_email() {
    let db = Database::open_in_memory().unwrap();
    db.insert_user(&make_user("juan@x.com")).unwrap();
    assert!(db.set_user_role_by_email("juan@x.com", Role::User).unwrap());
    let fetched = db.get_user_by_email("juan@x.com").unwrap().unwrap();
    assert_eq!(fetched.role, Role::User);
    assert!(!db.set_user_role_by_email("otro@x.com", Role::User).unwrap());
}

// ── Password resets ───────────────────────────────────────────

fn make_reset(user: &User, selector: &str) -> PasswordReset {
    PasswordReset {
        id: None,
        selector: selector.into(),
        verifier_hash: "vh".into(),
        user_id: user.id.clone(),
        email: user.email.clone(),
        created_at: "2025-01-01T00:00:00+00:00".into(),
        expires_at: "2025-01-01T01:00:00+00:00".into(),
        consumed_at: None,
        ip: Some("127.0.0.1".into()),
        user_agent: None,
    }
}

#[test]
fn test_password_reset_lifecycle() {
    let db = Database::open_in_memory().unwrap();
    let user = make_user("juan@x.com");
    db.insert_user(&user).unwrap();
    let id = db.insert_password_reset(&make_reset(&user, "sel1")).unwrap();

    let fetched = db.get_password_reset_by_selector("sel1").unwrap().unwrap();
    assert_eq!(fetched.id, Some(id));
    assert_eq!(fetched.ip.as_deref(), Some("127.0.0.1"));
    assert!(!fetched.is_consumed());

    assert_eq!(
        db.complete_password_reset(id, &user.id, "new-hash").unwrap(),
        ResetCompletion::Completed
    );
    let fetched = db.get_password_reset_by_selector("sel1").unwrap().unwrap();
    assert!(fetched.is_consumed());
    let stored = db.get_user_by_id(&user.id).unwrap().unwrap();
    assert_eq!(stored.password_hash, "new-hash");
}

#[test]
fn test_consumed_reset_does_not_write_hash() {
    let db = Database::open_in_memory().unwrap();
    let user = make_user("juan@x.com");
    db.insert_user(&user).unwrap();
    let id = db.insert_password_reset(&make_reset(&user, "sel1")).unwrap();

    db.complete_password_reset(id, &user.id, "first").unwrap();
    assert_eq!(
        db.complete_password_reset(id, &user.id, "second").unwrap(),
        ResetCompletion::AlreadyUsed
    );
    let stored = db.get_user_by_id(&user.id).unwrap().unwrap();
    assert_eq!(stored.password_hash, "first");
}

#[test]
fn test_reset_for_missing_user_rolls_back() {
    let db = Database::open_in_memory().unwrap();
    let user = make_user("juan@x.com");
    db.insert_user(&user).unwrap();
    let id = db.insert_password_reset(&make_reset(&user, "sel1")).unwrap();

    assert_eq!(
        db.complete_password_reset(id, "missing", "x").unwrap(),
        ResetCompletion::UnknownUser
    );
    let fetched = db.get_password_reset_by_selector("sel1").unwrap().unwrap();
    assert!(!fetched.is_consumed());
}

#[test]
fn test_password_reset_unknown_selector() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.get_password_reset_by_selector("nope").unwrap().is_none());
}

// ── Drafts ────────────────────────────────────────────────────

#[test]
fn test_save_new_draft_roundtrip() {
    let mut db = Database::open_in_memory().unwrap();
    let saved = make_draft("u1", "Cocina", "2025-01-01T00:00:00Z");
    assert_eq!(db.save_draft(&saved).unwrap(), DraftWrite::Created);

    let fetched = db.get_draft("u1", &saved.id).unwrap().unwrap();
    assert_eq!(fetched, saved);
    // Item "b" is selected but has an untouched blank line
    assert_eq!(fetched.draft.line("b").unwrap().quantity, "");
    assert_eq!(fetched.draft.selected[0].unit_price_materials, dec!(20000.50));
}

#[test]
fn test_selected_item_without_line_roundtrips() {
    let mut db = Database::open_in_memory().unwrap();
    let mut saved = make_draft("u1", "Cocina", "t0");
    saved.draft.lines.remove("b");
    db.save_draft(&saved).unwrap();
    let fetched = db.get_draft("u1", &saved.id).unwrap().unwrap();
    assert!(fetched.draft.line("b").is_none());
    assert_eq!(fetched.draft.selected_ids(), vec!["a", "b"]);
}

#[test]
fn test_update_draft() {
    let mut db = Database::open_in_memory().unwrap();
    let mut saved = make_draft("u1", "Cocina", "t0");
    db.save_draft(&saved).unwrap();

    saved.name = "Cocina v2".into();
    saved.updated_at = "t1".into();
    saved.draft.deselect("a");
    saved.draft.set_markup("0.2");
    assert_eq!(db.save_draft(&saved).unwrap(), DraftWrite::Updated);

    let fetched = db.get_draft("u1", &saved.id).unwrap().unwrap();
    assert_eq!(fetched.name, "Cocina v2");
    assert_eq!(fetched.created_at, "t0");
    assert_eq!(fetched.updated_at, "t1");
    assert_eq!(fetched.draft.markup, "0.2");
    assert_eq!(fetched.draft.selected_ids(), vec!["b"]);
}

#[test]
fn test_update_missing_draft_fails() {
    let mut db = Database::open_in_memory().unwrap();
    let mut saved = make_draft("u1", "Cocina", "t0");
    saved.updated_at = "t1".into();
    assert!(db.save_draft(&saved).is_err());
}

#[test]
fn test_update_other_users_draft_fails() {
    let mut db = Database::open_in_memory().unwrap();
    let mut saved = make_draft("u1", "Cocina", "t0");
    db.save_draft(&saved).unwrap();
    saved.user_id = "u2".into();
    saved.updated_at = "t1".into();
    assert!(db.save_draft(&saved).is_err());
    assert_eq!(db.get_draft("u1", &saved.id).unwrap().unwrap().updated_at, "t0");
}

#[test]
fn test_create_with_existing_id_fails() {
    let mut db = Database::open_in_memory().unwrap();
    let saved = make_draft("u1", "Cocina", "t0");
    db.save_draft(&saved).unwrap();
    assert!(db.save_draft(&saved).is_err());
}

#[test]
fn test_blank_name_rejected() {
    let mut db = Database::open_in_memory().unwrap();
    let saved = make_draft("u1", "  ", "t0");
    assert!(db.save_draft(&saved).is_err());
}

#[test]
fn test_drafts_ordered_by_updated_desc() {
    let mut db = Database::open_in_memory().unwrap();
    let old = make_draft("u1", "Vieja", "2025-01-01T00:00:00Z");
    let new = make_draft("u1", "Nueva", "2025-02-01T00:00:00Z");
    let other = make_draft("u2", "Ajena", "2025-03-01T00:00:00Z");
    db.save_draft(&old).unwrap();
    db.save_draft(&new).unwrap();
    db.save_draft(&other).unwrap();

    let drafts = db.get_drafts_for_user("u1").unwrap();
    let names: Vec<&str> = drafts.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Nueva", "Vieja"]);
    assert_eq!(drafts[0].draft.selected.len(), 2);
}

#[test]
fn test_delete_draft() {
    let mut db = Database::open_in_memory().unwrap();
    let saved = make_draft("u1", "Cocina", "t0");
    db.save_draft(&saved).unwrap();

    assert!(!db.delete_draft("u2", &saved.id).unwrap());
    assert!(db.delete_draft("u1", &saved.id).unwrap());
    assert!(db.get_draft("u1", &saved.id).unwrap().is_none());
    assert!(!db.delete_draft("u1", &saved.id).unwrap());

    let orphans: i64 = db
        .conn
        .query_row("SELECT COUNT(*) FROM draft_items", [], |r| r.get(0))
        .unwrap();
    assert_eq!(orphans, 0);
}

// ── Subscriptions ─────────────────────────────────────────────

#[test]
fn test_upsert_subscription() {
    let db = Database::open_in_memory().unwrap();
    let mut sub = Subscription {
        preapproval_id: "pre-1".into(),
        user_email: "juan@x.com".into(),
        status: "pending".into(),
        updated_at: "t0".into(),
    };
    db.upsert_subscription(&sub).unwrap();
    sub.status = "authorized".into();
    sub.updated_at = "t1".into();
    db.upsert_subscription(&sub).unwrap();

    assert_eq!(db.get_subscription("pre-1").unwrap(), Some(sub));
}
