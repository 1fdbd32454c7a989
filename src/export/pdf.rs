use anyhow::{anyhow, Context, Result};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use rust_decimal::Decimal;
use std::path::Path;

use super::{format_amount, format_rate, QuoteDocument, QuoteRow};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 15.0;
const ROW_H: f32 = 6.0;
const BODY_SIZE: f32 = 9.0;
const HEADING_SIZE: f32 = 18.0;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_RATIO: f32 = 0.5;
const PT_TO_MM: f32 = 0.3528;

// Column right edges (mm) for the numeric columns
const COL_ITEM: f32 = MARGIN;
const COL_QTY: f32 = 95.0;
const COL_UNIT: f32 = 110.0;
const COL_MAT_RIGHT: f32 = 145.0;
const COL_LAB_RIGHT: f32 = 170.0;
const COL_SUB_RIGHT: f32 = PAGE_W - MARGIN;

/// Builtin PDF fonts only cover plain Latin text; fold accents and unit
/// superscripts so labels stay legible.
fn pdf_text(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'Á' => 'A',
            'É' => 'E',
            'Í' => 'I',
            'Ó' => 'O',
            'Ú' => 'U',
            'ñ' => 'n',
            'Ñ' => 'N',
            '²' => '2',
            '³' => '3',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

fn text_width(s: &str, size: f32) -> f32 {
    s.chars().count() as f32 * size * GLYPH_RATIO * PT_TO_MM
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}.")
    }
}

fn amount_or_dash(value: Decimal) -> String {
    if value.is_zero() {
        "-".to_string()
    } else {
        format_amount(value)
    }
}

/// Cursor over the document that adds pages as rows run out.
struct Writer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl Writer {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Capa 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("Failed to load Helvetica: {e}"))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow!("Failed to load Helvetica-Bold: {e}"))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_H - MARGIN,
            pages: 1,
        })
    }

    fn ensure_room(&mut self, rows: usize) {
        if self.y - ROW_H * rows as f32 >= MARGIN {
            return;
        }
        self.pages += 1;
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Capa {}", self.pages));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_H - MARGIN;
    }

    fn text(&self, s: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(pdf_text(s), size, Mm(x), Mm(self.y), font);
    }

    fn text_right(&self, s: &str, size: f32, right: f32, bold: bool) {
        self.text(s, size, right - text_width(s, size), bold);
    }

    fn advance(&mut self, by: f32) {
        self.y -= by;
    }

    fn table_header(&mut self, include_materials: bool) {
        self.ensure_room(2);
        self.text("Item", BODY_SIZE, COL_ITEM, true);
        self.text("Cant.", BODY_SIZE, COL_QTY, true);
        self.text("Unidad", BODY_SIZE, COL_UNIT, true);
        if include_materials {
            self.text_right("Materiales", BODY_SIZE, COL_MAT_RIGHT, true);
        }
        self.text_right("Mano de obra", BODY_SIZE, COL_LAB_RIGHT, true);
        self.text_right("Subtotal", BODY_SIZE, COL_SUB_RIGHT, true);
        self.advance(ROW_H);
    }

    fn row(&mut self, row: &QuoteRow, include_materials: bool) {
        self.ensure_room(1);
        let label = format!("{} {}", row.code, row.name);
        self.text(&truncate(&label, 48), BODY_SIZE, COL_ITEM, false);
        self.text(&row.quantity, BODY_SIZE, COL_QTY, false);
        self.text(row.unit.symbol(), BODY_SIZE, COL_UNIT, false);
        if include_materials {
            self.text_right(&amount_or_dash(row.materials), BODY_SIZE, COL_MAT_RIGHT, false);
        }
        self.text_right(&amount_or_dash(row.labor), BODY_SIZE, COL_LAB_RIGHT, false);
        self.text_right(&format_amount(row.subtotal), BODY_SIZE, COL_SUB_RIGHT, false);
        self.advance(ROW_H);
    }

    fn total_line(&mut self, label: &str, value: &str, bold: bool) {
        self.ensure_room(1);
        self.text(label, BODY_SIZE + 1.0, COL_LAB_RIGHT - 45.0, bold);
        self.text_right(value, BODY_SIZE + 1.0, COL_SUB_RIGHT, bold);
        self.advance(ROW_H);
    }
}

/// Render the quote as an A4 PDF.
pub fn render(doc: &QuoteDocument) -> Result<Vec<u8>> {
    let header = &doc.header;
    let mut w = Writer::new(header.title.as_str())?;

    w.text(header.title.as_str(), HEADING_SIZE, MARGIN, true);
    w.advance(10.0);
    w.text(&format!("Fecha: {}", header.date), BODY_SIZE, MARGIN, false);
    w.advance(ROW_H);
    let meta = [
        ("Cliente", &header.client),
        ("Dirección", &header.address),
        ("Plazo estimado", &header.time_estimate),
    ];
    for (label, value) in meta {
        if !value.trim().is_empty() {
            w.text(&format!("{label}: {value}"), BODY_SIZE, MARGIN, false);
            w.advance(ROW_H);
        }
    }
    w.advance(ROW_H / 2.0);

    w.table_header(doc.include_materials);
    for group in &doc.groups {
        w.ensure_room(2);
        w.text(&group.name, BODY_SIZE, COL_ITEM, true);
        w.text_right(&format_amount(group.subtotal), BODY_SIZE, COL_SUB_RIGHT, true);
        w.advance(ROW_H);
        for row in &group.rows {
            w.row(row, doc.include_materials);
        }
    }

    w.advance(ROW_H / 2.0);
    let t = &doc.totals;
    if doc.include_materials {
        w.total_line("Materiales", &format_amount(t.materials_total), false);
    }
    w.total_line("Mano de obra", &format_amount(t.labor_total), false);
    w.total_line("Subtotal", &format_amount(t.subtotal), false);
    w.total_line("Ajuste de obra", &format_rate(t.markup_rate), false);
    w.total_line("Total", &format_amount(t.total), true);

    let footer = &doc.footer;
    let footer_lines: Vec<&str> = [&footer.issuer, &footer.address, &footer.contact]
        .into_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !footer_lines.is_empty() {
        w.advance(ROW_H);
        w.ensure_room(footer_lines.len());
        for line in footer_lines {
            w.text(line, BODY_SIZE - 1.0, MARGIN, false);
            w.advance(ROW_H - 1.0);
        }
    }

    w.doc
        .save_to_bytes()
        .map_err(|e| anyhow!("Failed to encode PDF: {e}"))
}

pub fn write_pdf(doc: &QuoteDocument, path: &Path) -> Result<()> {
    let bytes = render(doc)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write PDF: {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = doc.row_count(), "quote exported to PDF");
    Ok(())
}
