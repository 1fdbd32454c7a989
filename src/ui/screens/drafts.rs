use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::export::format_amount;
use crate::models::SavedDraft;
use crate::pricing::compute_totals;
use crate::ui::app::App;
use crate::ui::theme;
use crate::ui::util::truncate;

fn updated_label(saved: &SavedDraft) -> String {
    chrono::DateTime::parse_from_rfc3339(&saved.updated_at)
        .map(|dt| dt.with_timezone(&chrono::Local).format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_else(|_| saved.updated_at.clone())
}

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border_style())
        .title(Span::styled(
            format!(" Borradores de {} ({}) ", app.user.display_name(), app.drafts.len()),
            theme::title_style(),
        ));

    if app.drafts.is_empty() {
        let msg = vec![
            Line::from(""),
            Line::from(Span::styled("Todavía no guardaste presupuestos.", theme::dim_style())),
            Line::from(""),
            Line::from(Span::styled(
                "Elegí ítems en Selección (2) y guardá con :save <nombre>",
                theme::dim_style(),
            )),
        ];
        f.render_widget(Paragraph::new(msg).centered().block(block), area);
        return;
    }

    let header_cells = ["Nombre", "Actualizado", "Ítems", "Materiales", "Total"]
        .iter()
        .map(|h| Cell::from(*h).style(theme::header_style()));
    let header = Row::new(header_cells).height(1);

    let current = app.state().draft_id.as_deref();
    let rows: Vec<Row> = app
        .drafts
        .iter()
        .enumerate()
        .skip(app.draft_scroll)
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, saved)| {
            let totals = compute_totals(&saved.draft.selected, &saved.draft.lines, &saved.draft.markup)
                .with_materials(saved.include_materials);
            let mut name = truncate(&saved.name, 40);
            if current == Some(saved.id.as_str()) {
                name.push_str(" (abierto)");
            }
            let style = if i == app.draft_index {
                theme::selected_style()
            } else if i % 2 == 1 {
                theme::alt_row_style()
            } else {
                theme::normal_style()
            };
            Row::new(vec![
                Cell::from(name),
                Cell::from(updated_label(saved)),
                Cell::from(saved.draft.selected.len().to_string()),
                Cell::from(if saved.include_materials { "sí" } else { "no" }),
                Cell::from(format_amount(totals.total)).style(theme::total_style()),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Min(20),
        Constraint::Length(17),
        Constraint::Length(6),
        Constraint::Length(11),
        Constraint::Length(16),
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}
