use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use rust_decimal::Decimal;

use crate::export::{format_amount, format_rate};
use crate::pricing::{coerce_decimal, compute_totals, line_breakdown};
use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::truncate;

fn override_cell(value: Option<&str>, catalog: Decimal) -> String {
    match value {
        Some(v) if !v.is_empty() => format!("{}*", format_amount(coerce_decimal(v))),
        _ => format_amount(catalog),
    }
}

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(area);

    render_lines(f, chunks[0], app);
    render_totals(f, chunks[1], app);
}

fn render_lines(f: &mut Frame, area: Rect, app: &App) {
    let state = app.state();
    let draft = &state.draft;

    let header_cells = ["Ítem", "Cant.", "Unidad", "P.U. Mat.", "P.U. M.O.", "Subtotal"]
        .iter()
        .map(|h| Cell::from(*h).style(theme::header_style()));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = draft
        .selected
        .iter()
        .enumerate()
        .skip(app.edit_scroll)
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, item)| {
            let line = draft.line(&item.id);
            let quantity = line.map(|l| l.quantity.as_str()).unwrap_or("");
            let complete = coerce_decimal(quantity) > Decimal::ZERO;
            let subtotal = line
                .map(|l| line_breakdown(item, l))
                .map(|b| if state.include_materials { b.subtotal } else { b.labor })
                .unwrap_or(Decimal::ZERO);

            let style = if i == app.edit_index {
                theme::selected_style()
            } else if !complete {
                theme::incomplete_style()
            } else if i % 2 == 1 {
                theme::alt_row_style()
            } else {
                theme::normal_style()
            };

            Row::new(vec![
                Cell::from(truncate(&format!("{} {}", item.code, item.name), 44)),
                Cell::from(if quantity.is_empty() { "-" } else { quantity }.to_string()),
                Cell::from(item.unit.symbol()),
                Cell::from(override_cell(
                    line.and_then(|l| l.materials_override.as_deref()),
                    item.unit_price_materials,
                )),
                Cell::from(override_cell(
                    line.and_then(|l| l.labor_override.as_deref()),
                    item.unit_price_labor,
                )),
                Cell::from(format_amount(subtotal)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Min(24),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(14),
    ];

    let title = format!(
        " Cantidades ({}){} ",
        draft.selected.len(),
        if state.include_materials {
            ""
        } else {
            " - solo mano de obra"
        }
    );
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme::border_style())
            .title(Span::styled(title, theme::title_style())),
    );
    f.render_widget(table, area);
}

fn render_totals(f: &mut Frame, area: Rect, app: &App) {
    let state = app.state();
    let totals = compute_totals(&state.draft.selected, &state.draft.lines, &state.draft.markup)
        .with_materials(state.include_materials);
    let line = Line::from(vec![
        Span::styled(" Subtotal ", theme::dim_style()),
        Span::styled(format_amount(totals.subtotal), theme::normal_style()),
        Span::styled("   Ajuste ", theme::dim_style()),
        Span::styled(format_rate(totals.markup_rate), theme::normal_style()),
        Span::styled("   Total ", theme::dim_style()),
        Span::styled(format_amount(totals.total), theme::total_style()),
        Span::styled(
            if state.draft.can_review() {
                "   Enter/4 revisar"
            } else {
                "   faltan cantidades"
            },
            theme::dim_style(),
        ),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border_style());
    f.render_widget(Paragraph::new(line).block(block), area);
}
