use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::catalog::parent_display_code;
use crate::export::format_amount;
use crate::ui::app::{App, SelectRow};
use crate::ui::theme;
use crate::ui::util::truncate;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let selected_count = app.state().draft.selected.len();
    let title = format!(
        " Catálogo ({} ítems) [{selected_count} seleccionados] {}",
        app.selected_item_count(),
        if app.search_input.is_empty() {
            String::new()
        } else {
            format!("búsqueda: '{}' ", app.search_input)
        }
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border_style())
        .title(Span::styled(title, theme::title_style()));

    if app.select_rows.is_empty() {
        let msg = vec![
            Line::from(""),
            Line::from(Span::styled(
                format!("Sin resultados para '{}'", app.search_input),
                theme::dim_style(),
            )),
            Line::from(""),
            Line::from(Span::styled("Esc borra la búsqueda", theme::dim_style())),
        ];
        f.render_widget(Paragraph::new(msg).centered().block(block), area);
        return;
    }

    let header_cells = ["", "Código", "Ítem", "Unidad", "P.U. Mat.", "P.U. M.O."]
        .iter()
        .map(|h| Cell::from(*h).style(theme::header_style()));
    let header = Row::new(header_cells).height(1);

    let draft = &app.state().draft;
    let rows: Vec<Row> = app
        .select_rows
        .iter()
        .enumerate()
        .skip(app.select_scroll)
        .take(area.height.saturating_sub(3) as usize)
        .map(|(i, row)| {
            let is_cursor = i == app.select_index;
            match row {
                SelectRow::Chapter { code, label } => {
                    let display = parent_display_code(label, &app.partition.parents);
                    let code_text = if display > 0 {
                        display.to_string()
                    } else {
                        code.to_string()
                    };
                    let style = if is_cursor {
                        theme::selected_style()
                    } else {
                        theme::chapter_style()
                    };
                    Row::new(vec![
                        Cell::from(""),
                        Cell::from(code_text),
                        Cell::from(label.clone()),
                        Cell::from(""),
                        Cell::from(""),
                        Cell::from(""),
                    ])
                    .style(style)
                }
                SelectRow::Item(item) => {
                    let checked = draft.is_selected(&item.id);
                    let style = if is_cursor {
                        theme::selected_style()
                    } else if checked {
                        theme::total_style()
                    } else if i % 2 == 1 {
                        theme::alt_row_style()
                    } else {
                        theme::normal_style()
                    };
                    Row::new(vec![
                        Cell::from(if checked { "[x]" } else { "[ ]" }),
                        Cell::from(item.code.to_string()),
                        Cell::from(truncate(&item.name, 48)),
                        Cell::from(item.unit.symbol()),
                        Cell::from(format_amount(item.unit_price_materials)),
                        Cell::from(format_amount(item.unit_price_labor)),
                    ])
                    .style(style)
                }
            }
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Length(7),
        Constraint::Min(24),
        Constraint::Length(7),
        Constraint::Length(14),
        Constraint::Length(14),
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    f.render_widget(table, area);
}
