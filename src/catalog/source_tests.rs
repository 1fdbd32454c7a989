#![allow(clippy::unwrap_used)]

use super::*;
use rust_decimal_macros::dec;
use std::io::Write;

fn make_csv_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn settings_with(source: Option<String>) -> Settings {
    Settings {
        catalog_source: source,
        ..Settings::default()
    }
}

// ── parse ─────────────────────────────────────────────────────

#[test]
fn test_parse_full_row() {
    let csv = "id,code,chapter,name,unit,pu_materials,pu_labor\n\
               12-contrapiso-10,1201,Contrapisos,Contrapiso 10 cm,m2,20000,28000\n";
    let items = CatalogSource::parse(csv.as_bytes()).unwrap();
    assert_eq!(items.len(), 1);
    let it = &items[0];
    assert_eq!(it.id, "12-contrapiso-10");
    assert_eq!(it.code, 1201);
    assert_eq!(it.chapter, "Contrapisos");
    assert_eq!(it.name, "Contrapiso 10 cm");
    assert_eq!(it.unit, Unit::SquareMeter);
    assert_eq!(it.unit_price_materials, dec!(20000));
    assert_eq!(it.unit_price_labor, dec!(28000));
    assert!(it.parent_name.is_empty());
}

#[test]
fn test_parse_columns_in_any_order_and_case() {
    let csv = "PU_LABOR,Name,Code,Unit,Chapter,PU_Materials,Extra\n\
               7200,Zócalo de madera,2201,ML,Zócalos,4000,ignored\n";
    let items = CatalogSource::parse(csv.as_bytes()).unwrap();
    assert_eq!(items[0].code, 2201);
    assert_eq!(items[0].unit, Unit::LinearMeter);
    assert_eq!(items[0].unit_price_labor, dec!(7200));
    assert_eq!(items[0].unit_price_materials, dec!(4000));
}

#[test]
fn test_parse_missing_id_uses_row_index() {
    let csv = "code,name\n1200,Contrapisos\n1201,Contrapiso\n";
    let items = CatalogSource::parse(csv.as_bytes()).unwrap();
    assert_eq!(items[0].id, "row-0");
    assert_eq!(items[1].id, "row-1");
}

#[test]
fn test_parse_coerces_bad_numbers() {
    let csv = "id,code,name,unit,pu_materials,pu_labor\n\
               x,abc,Raro,kg,n/a,\n";
    let items = CatalogSource::parse(csv.as_bytes()).unwrap();
    assert_eq!(items[0].code, 0);
    assert_eq!(items[0].unit, Unit::Each);
    assert_eq!(items[0].unit_price_materials, dec!(0));
    assert_eq!(items[0].unit_price_labor, dec!(0));
}

#[test]
fn test_parse_skips_blank_rows() {
    let csv = "code,name\n1200,Contrapisos\n,\n1201,Contrapiso\n";
    let items = CatalogSource::parse(csv.as_bytes()).unwrap();
    assert_eq!(items.len(), 2);
}

#[test]
fn test_parse_requires_code_and_name() {
    let csv = "id,chapter\na,b\n";
    assert!(CatalogSource::parse(csv.as_bytes()).is_err());
}

#[test]
fn test_from_path() {
    let file = make_csv_file("code,name,pu_labor\n1901,Cerámico,26000\n");
    let items = CatalogSource::from_path(file.path()).unwrap();
    assert_eq!(items[0].unit_price_labor, dec!(26000));
}

// ── load ──────────────────────────────────────────────────────

#[test]
fn test_load_without_source_uses_fallback() {
    let (items, origin) = CatalogSource::load(&settings_with(None));
    assert_eq!(origin, CatalogOrigin::Fallback);
    assert!(!items.is_empty());
}

#[test]
fn test_load_from_file() {
    let file = make_csv_file("code,name\n1200,Contrapisos\n1201,Contrapiso\n");
    let path = file.path().display().to_string();
    let (items, origin) = CatalogSource::load(&settings_with(Some(path)));
    assert_eq!(origin, CatalogOrigin::File(file.path().to_path_buf()));
    assert_eq!(items.len(), 2);
}

#[test]
fn test_load_missing_file_falls_back() {
    let (items, origin) =
        CatalogSource::load(&settings_with(Some("/definitely/not/here.csv".into())));
    assert_eq!(origin, CatalogOrigin::Fallback);
    assert_eq!(items, fallback_items());
}

#[test]
fn test_load_empty_file_falls_back() {
    let file = make_csv_file("code,name\n");
    let path = file.path().display().to_string();
    let (_, origin) = CatalogSource::load(&settings_with(Some(path)));
    assert_eq!(origin, CatalogOrigin::Fallback);
}

// ── fallback ──────────────────────────────────────────────────

#[test]
fn test_fallback_every_child_has_parent() {
    let items = fallback_items();
    for child in items.iter().filter(|i| !i.is_chapter()) {
        assert!(
            items
                .iter()
                .any(|p| p.is_chapter() && p.code == child.chapter_code()),
            "no parent for {child}"
        );
    }
}

#[test]
fn test_fallback_ids_unique() {
    let items = fallback_items();
    let mut ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), items.len());
}

#[test]
fn test_is_url() {
    assert!(is_url("https://docs.google.com/x.csv"));
    assert!(is_url("HTTP://host/feed"));
    assert!(!is_url("/tmp/catalog.csv"));
}
