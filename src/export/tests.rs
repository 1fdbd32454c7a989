#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;

use super::*;
use crate::models::HeaderInput;

fn item(id: &str, code: i64, parent: &str, mat: Decimal, labor: Decimal) -> CatalogItem {
    let mut it = CatalogItem::new(id, code, parent, format!("Item {id}"), Unit::SquareMeter, mat, labor);
    it.parent_name = parent.into();
    it
}

fn line(id: &str, qty: &str) -> (String, DraftLine) {
    (
        id.to_string(),
        DraftLine {
            item_id: id.into(),
            quantity: qty.into(),
            ..Default::default()
        },
    )
}

fn header() -> QuoteHeader {
    QuoteHeader::from_input(&HeaderInput {
        date: Some("2025-10-18".into()),
        client: Some("Juan Pérez".into()),
        ..Default::default()
    })
}

/// contrapiso: 10 × (20000 + 28000); loose: 2 × (100 + 50); revoque: blank qty;
/// unused: no line.
fn fixture() -> (Vec<CatalogItem>, BTreeMap<String, DraftLine>) {
    let items = vec![
        item("contrapiso", 1201, "Contrapisos", dec!(20000), dec!(28000)),
        item("loose", 7, "", dec!(100), dec!(50)),
        item("revoque", 1601, "Revestimientos", dec!(1000), dec!(500)),
        item("unused", 1602, "Revestimientos", dec!(1), dec!(1)),
    ];
    let lines = [
        line("contrapiso", "10"),
        line("loose", "2"),
        line("revoque", ""),
    ]
    .into_iter()
    .collect();
    (items, lines)
}

fn build(include_materials: bool) -> QuoteDocument {
    let (items, lines) = fixture();
    QuoteDocument::build(
        &items,
        &lines,
        "0.10",
        include_materials,
        header(),
        QuoteFooter::default(),
    )
}

// ── Building ──────────────────────────────────────────────────

#[test]
fn test_groups_in_first_appearance_order() {
    let doc = build(true);
    let names: Vec<&str> = doc.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Contrapisos", OTHER_GROUP, "Revestimientos"]);
    assert_eq!(doc.row_count(), 3);
    assert_eq!(doc.groups[2].rows.len(), 1);
}

#[test]
fn test_rows_carry_breakdown() {
    let doc = build(true);
    let row = &doc.groups[0].rows[0];
    assert_eq!(row.quantity, "10");
    assert_eq!(row.materials, dec!(200000));
    assert_eq!(row.labor, dec!(280000));
    assert_eq!(row.subtotal, dec!(480000));

    let blank = &doc.groups[2].rows[0];
    assert_eq!(blank.quantity, "0");
    assert_eq!(blank.subtotal, Decimal::ZERO);
}

#[test]
fn test_totals_with_materials() {
    let doc = build(true);
    assert_eq!(doc.totals.materials_total, dec!(200200));
    assert_eq!(doc.totals.labor_total, dec!(280100));
    assert_eq!(doc.totals.subtotal, dec!(480300));
    assert_eq!(doc.totals.total, dec!(528330));
}

#[test]
fn test_labor_only_document() {
    let doc = build(false);
    let row = &doc.groups[0].rows[0];
    assert_eq!(row.subtotal, dec!(280000));
    assert_eq!(doc.groups[0].subtotal, dec!(280000));
    assert_eq!(doc.totals.materials_total, Decimal::ZERO);
    assert_eq!(doc.totals.subtotal, dec!(280100));
    assert_eq!(doc.totals.total, dec!(308110));
}

#[test]
fn test_group_subtotals_add_up_to_subtotal() {
    for include in [true, false] {
        let doc = build(include);
        let sum: Decimal = doc.groups.iter().map(|g| g.subtotal).sum();
        assert_eq!(sum, doc.totals.subtotal);
        for group in &doc.groups {
            let rows: Decimal = group.rows.iter().map(|r| r.subtotal).sum();
            assert_eq!(rows, group.subtotal);
        }
    }
}

#[test]
fn test_empty_document() {
    let doc = QuoteDocument::build(
        &[],
        &BTreeMap::new(),
        "0.10",
        true,
        QuoteHeader::default(),
        QuoteFooter::default(),
    );
    assert!(doc.groups.is_empty());
    assert_eq!(doc.totals.total, Decimal::ZERO);
}

// ── File names ────────────────────────────────────────────────

#[test]
fn test_file_stem() {
    let doc = build(true);
    assert_eq!(doc.file_stem(), "presupuesto-de-obra-juan-prez-18102025");
}

#[test]
fn test_file_stem_default_client() {
    let mut doc = build(true);
    doc.header.client = "  ".into();
    assert_eq!(doc.file_stem(), "presupuesto-de-obra-cliente-18102025");
}

// ── Formatting ────────────────────────────────────────────────

#[test]
fn test_format_amount() {
    assert_eq!(format_amount(dec!(528000)), "$ 528.000");
    assert_eq!(format_amount(dec!(0)), "$ 0");
    assert_eq!(format_amount(dec!(999.5)), "$ 1.000");
    assert_eq!(format_amount(dec!(1234567.49)), "$ 1.234.567");
    assert_eq!(format_amount(dec!(-1234)), "-$ 1.234");
    assert_eq!(format_amount(dec!(-0.2)), "$ 0");
}

#[test]
fn test_format_rate() {
    assert_eq!(format_rate(dec!(0.10)), "10%");
    assert_eq!(format_rate(dec!(0)), "0%");
    assert_eq!(format_rate(dec!(0.125)), "13%");
}

#[test]
fn test_format_rate_out_of_range_is_zero() {
    assert_eq!(format_rate(Decimal::MAX), "0%");
    assert_eq!(format_rate(dec!(10000000000000000000000000000)), "0%");
    assert_eq!(format_amount(Decimal::MAX), "$ 79.228.162.514.264.337.593.543.950.335");
}

#[test]
fn test_document_with_overflowing_markup() {
    let (items, lines) = fixture();
    let doc = QuoteDocument::build(
        &items,
        &lines,
        "1e28",
        true,
        header(),
        QuoteFooter::default(),
    );
    assert_eq!(doc.totals.total, Decimal::ZERO);
    assert_eq!(doc.totals.markup_amount(), Decimal::ZERO);
    assert!(doc.totals.subtotal > Decimal::ZERO);
}

// ── Renderers ─────────────────────────────────────────────────

#[test]
fn test_csv_records() {
    let doc = build(true);
    let mut out = Vec::new();
    super::csv::write_records(&doc, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        "grupo,codigo,item,cantidad,unidad,materiales,mano_de_obra,subtotal"
    );
    assert_eq!(
        lines[1],
        "Contrapisos,1201,Item contrapiso,10,m2,200000,280000,480000"
    );
    assert_eq!(lines[2], "Contrapisos,,Subtotal grupo,,,,,480000");
    // 3 rows + 3 group subtotals + 5 totals
    assert_eq!(lines.len(), 12);
    assert_eq!(lines[11], ",,Total,,,,,528330");
}

#[test]
fn test_csv_labor_only_omits_materials() {
    let doc = build(false);
    let mut out = Vec::new();
    super::csv::write_records(&doc, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Contrapisos,1201,Item contrapiso,10,m2,,280000,280000"));
    assert!(!text.contains("Materiales"));
    assert_eq!(text.lines().count(), 11);
}

#[test]
fn test_write_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quote.csv");
    write_csv(&build(true), &path).unwrap();
    assert!(std::fs::read_to_string(&path).unwrap().starts_with("grupo,"));
}

#[test]
fn test_pdf_render() {
    let bytes = super::pdf::render(&build(true)).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn test_pdf_paginates_long_quotes() {
    let items: Vec<CatalogItem> = (1..=120)
        .map(|i| item(&format!("it{i}"), 1200 + i, "Contrapisos", dec!(10), dec!(5)))
        .collect();
    let lines = items.iter().map(|it| line(&it.id, "1")).collect();
    let doc = QuoteDocument::build(
        &items,
        &lines,
        "0.10",
        true,
        header(),
        QuoteFooter {
            issuer: "Constructora Sur".into(),
            address: "Calle 1".into(),
            contact: "sur@x.com".into(),
        },
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.pdf");
    write_pdf(&doc, &path).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}
