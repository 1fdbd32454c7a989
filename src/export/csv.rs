use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::io::Write;
use std::path::Path;

use super::QuoteDocument;

const HEADER: [&str; 8] = [
    "grupo",
    "codigo",
    "item",
    "cantidad",
    "unidad",
    "materiales",
    "mano_de_obra",
    "subtotal",
];

fn amount(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Write one record per line, a subtotal record per group and the totals.
/// Amounts are exact decimals, not display-formatted.
pub fn write_records<W: Write>(doc: &QuoteDocument, out: W) -> Result<()> {
    let mut wtr = ::csv::Writer::from_writer(out);
    wtr.write_record(HEADER)?;

    for group in &doc.groups {
        for row in &group.rows {
            let materials = if doc.include_materials {
                amount(row.materials)
            } else {
                String::new()
            };
            wtr.write_record([
                group.name.clone(),
                row.code.to_string(),
                row.name.clone(),
                row.quantity.clone(),
                row.unit.as_str().to_string(),
                materials,
                amount(row.labor),
                amount(row.subtotal),
            ])?;
        }
        wtr.write_record([
            group.name.as_str(),
            "",
            "Subtotal grupo",
            "",
            "",
            "",
            "",
            amount(group.subtotal).as_str(),
        ])?;
    }

    let t = &doc.totals;
    let mut totals = vec![
        ("Materiales", amount(t.materials_total)),
        ("Mano de obra", amount(t.labor_total)),
        ("Subtotal", amount(t.subtotal)),
        ("Ajuste de obra", amount(t.markup_rate)),
        ("Total", amount(t.total)),
    ];
    if !doc.include_materials {
        totals.remove(0);
    }
    for (label, value) in totals {
        wtr.write_record(["", "", label, "", "", "", "", value.as_str()])?;
    }

    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn write_csv(doc: &QuoteDocument, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    write_records(doc, file)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = doc.row_count(), "quote exported to CSV");
    Ok(())
}
