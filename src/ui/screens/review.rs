use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::export::{format_amount, format_rate, QuoteDocument};
use crate::ui::app::App;
use crate::ui::commands::current_document;
use crate::ui::theme;
use crate::ui::util::truncate;

pub(crate) fn render(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(36)])
        .split(area);

    let doc = current_document(app);
    render_groups(f, chunks[0], app, &doc);
    render_totals(f, chunks[1], app, &doc);
}

fn render_groups(f: &mut Frame, area: Rect, app: &App, doc: &QuoteDocument) {
    let mut lines: Vec<Line> = Vec::new();
    for group in &doc.groups {
        lines.push(Line::from(vec![
            Span::styled(group.name.clone(), theme::chapter_style()),
            Span::styled(
                format!("  {}", format_amount(group.subtotal)),
                theme::dim_style(),
            ),
        ]));
        for row in &group.rows {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:>5} {:<40}", row.code, truncate(&row.name, 40)),
                    theme::normal_style(),
                ),
                Span::styled(
                    format!(" {:>8} {:<4}", row.quantity, row.unit.symbol()),
                    theme::dim_style(),
                ),
                Span::styled(
                    format!(" {:>14}", format_amount(row.subtotal)),
                    theme::normal_style(),
                ),
            ]));
        }
        lines.push(Line::from(""));
    }

    let title = format!(
        " {} ({} ítems) ",
        if app.state().name.is_empty() {
            "Sin nombre"
        } else {
            app.state().name.as_str()
        },
        doc.row_count()
    );
    let paragraph = Paragraph::new(lines)
        .scroll((app.review_scroll.min(u16::MAX as usize) as u16, 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme::border_style())
                .title(Span::styled(title, theme::title_style())),
        );
    f.render_widget(paragraph, area);
}

fn render_totals(f: &mut Frame, area: Rect, app: &App, doc: &QuoteDocument) {
    let totals = &doc.totals;
    let row = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!(" {label:<14}"), theme::dim_style()),
            Span::styled(format!("{value:>18}"), theme::normal_style()),
        ])
    };

    let mut lines = vec![Line::from("")];
    if doc.include_materials {
        lines.push(row("Materiales", format_amount(totals.materials_total)));
    }
    lines.push(row("Mano de obra", format_amount(totals.labor_total)));
    lines.push(row("Subtotal", format_amount(totals.subtotal)));
    lines.push(row(
        &format!("Ajuste {}", format_rate(totals.markup_rate)),
        format_amount(totals.markup_amount()),
    ));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(format!(" {:<14}", "TOTAL"), theme::total_style()),
        Span::styled(format!("{:>18}", format_amount(totals.total)), theme::total_style()),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        if app.state().include_materials {
            " Materiales incluidos"
        } else {
            " Solo mano de obra"
        },
        theme::dim_style(),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" :export  PDF", theme::dim_style())));
    lines.push(Line::from(Span::styled(" :export-csv  CSV", theme::dim_style())));
    lines.push(Line::from(Span::styled(" :save <nombre>", theme::dim_style())));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::border_style())
        .title(Span::styled(" Totales ", theme::title_style()));
    f.render_widget(Paragraph::new(lines).block(block), area);
}
