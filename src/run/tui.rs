use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

use crate::billing;
use crate::catalog::CatalogSource;
use crate::config::{Paths, Settings};
use crate::db::Database;
use crate::session::{Action, PersistedState, StateFile, Step, WizardState};
use crate::ui::app::{App, EditTarget, InputMode, LineField, PendingAction, Screen, SelectRow};
use crate::ui::commands::{self, go_to};
use crate::ui::util::{scroll_down, scroll_to_bottom, scroll_to_top, scroll_up};

pub(crate) fn as_tui(paths: &Paths, settings: Settings, db: &mut Database) -> Result<()> {
    let state_file = StateFile::new(paths.state_file());
    let had_state = state_file.path().exists();
    let persisted = state_file.load();

    let Some(user) = super::signed_in_user(db, &persisted)? else {
        anyhow::bail!("No hay sesión iniciada. Usá: obratui login <email>");
    };
    if !billing::has_access(&user) {
        anyhow::bail!("Tu cuenta no tiene una suscripción activa. Usá: obratui subscribe");
    }

    let mut wizard = if had_state {
        persisted.wizard
    } else {
        WizardState::fresh(&settings.default_markup)
    };
    if !wizard.can_enter(wizard.step) {
        wizard.step = Step::Select;
    }

    let (catalog, origin) = CatalogSource::load(&settings);
    tracing::info!(user_id = %user.id, items = catalog.len(), origin = %origin, "starting wizard");

    let user_id = user.id.clone();
    let mut app = App::new(user, settings, &catalog, origin, wizard);
    app.store.subscribe(move |state: &WizardState, _action: &Action| {
        let snapshot = PersistedState::new(Some(user_id.clone()), state.clone());
        if let Err(e) = state_file.save(&snapshot) {
            tracing::warn!(error = %format!("{e:#}"), "failed to save wizard state");
        }
    });
    app.refresh_drafts(db)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, db);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = result {
        tracing::error!(error = %format!("{e:#}"), "wizard exited with error");
        eprintln!("Error: {e:?}");
    }

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    db: &mut Database,
) -> Result<()> {
    while app.running {
        terminal.draw(|f| {
            let content_height = f.area().height.saturating_sub(3) as usize;
            app.visible_rows = content_height.max(1);
            crate::ui::render::render(f, app);
        })?;

        if let Event::Key(key) = event::read()? {
            if app.show_help {
                app.show_help = false;
                continue;
            }
            match app.input_mode {
                InputMode::Normal => handle_normal_input(key, app, db)?,
                InputMode::Command => handle_command_input(key, app, db)?,
                InputMode::Search => handle_search_input(key, app)?,
                InputMode::Editing => handle_editing_input(key, app)?,
                InputMode::Confirm => handle_confirm_input(key, app, db)?,
            }
        }
    }
    Ok(())
}

// ── Input handlers ───────────────────────────────────────────

fn handle_normal_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match key.code {
        KeyCode::Char(':') => {
            app.input_mode = InputMode::Command;
            app.command_input.clear();
        }
        KeyCode::Char('/') => {
            if app.screen != Screen::Select {
                go_to(app, db, Screen::Select)?;
            }
            app.input_mode = InputMode::Search;
            app.search_input.clear();
            refresh_search(app);
        }
        KeyCode::Char('q') | KeyCode::Char('c')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            app.running = false;
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half_page = app.visible_rows / 2;
            for _ in 0..half_page {
                handle_move_down(app);
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half_page = app.visible_rows / 2;
            for _ in 0..half_page {
                handle_move_up(app);
            }
        }
        KeyCode::Char('j') | KeyCode::Down => handle_move_down(app),
        KeyCode::Char('k') | KeyCode::Up => handle_move_up(app),
        KeyCode::Char(c @ '1'..='4') => {
            let idx = (c as usize) - ('1' as usize);
            if let Some(&screen) = Screen::all().get(idx) {
                go_to(app, db, screen)?;
            }
        }
        KeyCode::Tab => {
            let screens = Screen::all();
            let idx = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
            let next = (idx + 1) % screens.len();
            go_to(app, db, screens[next])?;
        }
        KeyCode::BackTab => {
            let screens = Screen::all();
            let idx = screens.iter().position(|s| *s == app.screen).unwrap_or(0);
            let prev = if idx == 0 { screens.len() - 1 } else { idx - 1 };
            go_to(app, db, screens[prev])?;
        }
        KeyCode::Enter => handle_enter(app, db)?,
        KeyCode::Esc => handle_escape(app),
        KeyCode::Char('g') => handle_goto_top(app),
        KeyCode::Char('G') => handle_goto_bottom(app),
        KeyCode::Char('?') => {
            app.show_help = true;
        }
        KeyCode::Char(' ') if app.screen == Screen::Select => {
            if let Some(SelectRow::Item(item)) = app.select_rows.get(app.select_index) {
                let item = item.clone();
                app.dispatch(Action::ToggleSelect(item.clone()));
                let verb = if app.state().draft.is_selected(&item.id) {
                    "Agregado"
                } else {
                    "Quitado"
                };
                app.set_status(format!("{verb}: {}", item.name));
            }
            handle_move_down(app);
        }
        KeyCode::Char('m') if app.screen == Screen::Edit => start_edit(app, LineField::Materials),
        KeyCode::Char('l') if app.screen == Screen::Edit => start_edit(app, LineField::Labor),
        KeyCode::Char('D') if app.screen == Screen::Drafts => {
            commands::handle_command("delete-draft", app, db)?;
        }
        _ => {}
    }
    Ok(())
}

fn handle_command_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match key.code {
        KeyCode::Enter => {
            let input = app.command_input.clone();
            app.input_mode = InputMode::Normal;
            app.command_input.clear();
            commands::handle_command(&input, app, db)?;
        }
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.command_input.clear();
        }
        KeyCode::Backspace => {
            app.command_input.pop();
            if app.command_input.is_empty() {
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.command_input.clear();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let trimmed = app.command_input.trim_end();
            if let Some(pos) = trimmed.rfind(' ') {
                app.command_input.truncate(pos + 1);
            } else {
                app.command_input.clear();
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Char(c) => {
            app.command_input.push(c);
        }
        _ => {}
    }
    Ok(())
}

fn refresh_search(app: &mut App) {
    app.select_index = 0;
    app.select_scroll = 0;
    app.refresh_select_rows();
}

fn handle_search_input(key: event::KeyEvent, app: &mut App) -> Result<()> {
    match key.code {
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.search_input.clear();
            refresh_search(app);
        }
        KeyCode::Backspace => {
            app.search_input.pop();
            refresh_search(app);
        }
        KeyCode::Char(c) => {
            app.search_input.push(c);
            refresh_search(app);
        }
        _ => {}
    }
    Ok(())
}

/// Open the edit prompt for `field` of the line under the cursor.
fn start_edit(app: &mut App, field: LineField) {
    let Some(item) = app.edit_item() else {
        return;
    };
    let item_id = item.id.clone();
    let line = app.state().draft.line(&item_id);
    let current = match field {
        LineField::Quantity => line.map(|l| l.quantity.clone()),
        LineField::Materials => line.and_then(|l| l.materials_override.clone()),
        LineField::Labor => line.and_then(|l| l.labor_override.clone()),
    };
    app.command_input = current.unwrap_or_default();
    app.edit_target = Some(EditTarget { item_id, field });
    app.input_mode = InputMode::Editing;
}

fn handle_editing_input(key: event::KeyEvent, app: &mut App) -> Result<()> {
    match key.code {
        KeyCode::Enter => {
            if let Some(target) = app.edit_target.take() {
                let value = app.command_input.trim().to_string();
                app.dispatch(Action::SetLine {
                    item_id: target.item_id,
                    patch: target.field.patch(&value),
                });
                if value.is_empty() && target.field != LineField::Quantity {
                    app.set_status(format!("{}: precio de catálogo", target.field.label()));
                } else {
                    app.set_status(format!("{}: {value}", target.field.label()));
                }
                if target.field == LineField::Quantity {
                    handle_move_down(app);
                }
            }
            app.command_input.clear();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Esc => {
            app.edit_target = None;
            app.command_input.clear();
            app.input_mode = InputMode::Normal;
            app.set_status("Edición cancelada");
        }
        KeyCode::Backspace => {
            app.command_input.pop();
        }
        KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | 'e' | 'E') => {
            app.command_input.push(if c == ',' { '.' } else { c });
        }
        _ => {}
    }
    Ok(())
}

fn handle_confirm_input(key: event::KeyEvent, app: &mut App, db: &mut Database) -> Result<()> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('s') | KeyCode::Char('S') => {
            if let Some(action) = app.pending_action.take() {
                match action {
                    PendingAction::DeleteDraft { id, name } => {
                        if db.delete_draft(&app.user.id, &id)? {
                            if app.state().draft_id.as_deref() == Some(id.as_str()) {
                                let markup = app.settings.default_markup.clone();
                                app.dispatch(Action::Reset { markup });
                            }
                            app.set_status(format!("Borrado: {name}"));
                        } else {
                            app.set_status(format!("No se encontró: {name}"));
                        }
                        app.refresh_drafts(db)?;
                    }
                    PendingAction::NewDraft => {
                        let markup = app.settings.default_markup.clone();
                        app.dispatch(Action::Reset { markup });
                        app.edit_index = 0;
                        app.edit_scroll = 0;
                        go_to(app, db, Screen::Select)?;
                        app.set_status("Presupuesto nuevo");
                    }
                }
            }
            app.input_mode = InputMode::Normal;
            app.confirm_message.clear();
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.pending_action = None;
            app.input_mode = InputMode::Normal;
            app.confirm_message.clear();
            app.set_status("Cancelado");
        }
        _ => {}
    }
    Ok(())
}

// ── Navigation helpers ───────────────────────────────────────

fn edit_page(app: &App) -> usize {
    app.list_page().saturating_sub(3).max(1)
}

fn review_len(app: &App) -> usize {
    let doc = commands::current_document(app);
    doc.row_count() + doc.groups.len() * 2
}

fn handle_move_down(app: &mut App) {
    match app.screen {
        Screen::Drafts => {
            let page = app.list_page();
            scroll_down(
                &mut app.draft_index,
                &mut app.draft_scroll,
                app.drafts.len(),
                page,
            );
        }
        Screen::Select => {
            let page = app.list_page();
            scroll_down(
                &mut app.select_index,
                &mut app.select_scroll,
                app.select_rows.len(),
                page,
            );
        }
        Screen::Edit => {
            let page = edit_page(app);
            let len = app.state().draft.selected.len();
            scroll_down(&mut app.edit_index, &mut app.edit_scroll, len, page);
        }
        Screen::Review => {
            if app.review_scroll + 1 < review_len(app) {
                app.review_scroll += 1;
            }
        }
    }
}

fn handle_move_up(app: &mut App) {
    match app.screen {
        Screen::Drafts => scroll_up(&mut app.draft_index, &mut app.draft_scroll),
        Screen::Select => scroll_up(&mut app.select_index, &mut app.select_scroll),
        Screen::Edit => scroll_up(&mut app.edit_index, &mut app.edit_scroll),
        Screen::Review => app.review_scroll = app.review_scroll.saturating_sub(1),
    }
}

fn handle_enter(app: &mut App, db: &mut Database) -> Result<()> {
    match app.screen {
        Screen::Drafts => {
            if let Some(saved) = app.drafts.get(app.draft_index).cloned() {
                let name = saved.name.clone();
                app.dispatch(Action::Load(saved));
                app.edit_index = 0;
                app.edit_scroll = 0;
                let screen = Screen::for_step(app.state().step);
                go_to(app, db, screen)?;
                app.set_status(format!("Abierto: {name}"));
            }
        }
        Screen::Select => go_to(app, db, Screen::Edit)?,
        Screen::Edit => start_edit(app, LineField::Quantity),
        Screen::Review => app.set_status("Usá :export o :export-csv"),
    }
    Ok(())
}

fn handle_escape(app: &mut App) {
    match app.screen {
        Screen::Select if !app.search_input.is_empty() => {
            app.search_input.clear();
            refresh_search(app);
            app.set_status("Búsqueda borrada");
        }
        _ => {
            app.status_message.clear();
        }
    }
}

fn handle_goto_top(app: &mut App) {
    match app.screen {
        Screen::Drafts => scroll_to_top(&mut app.draft_index, &mut app.draft_scroll),
        Screen::Select => scroll_to_top(&mut app.select_index, &mut app.select_scroll),
        Screen::Edit => scroll_to_top(&mut app.edit_index, &mut app.edit_scroll),
        Screen::Review => app.review_scroll = 0,
    }
}

fn handle_goto_bottom(app: &mut App) {
    match app.screen {
        Screen::Drafts => {
            let page = app.list_page();
            scroll_to_bottom(
                &mut app.draft_index,
                &mut app.draft_scroll,
                app.drafts.len(),
                page,
            );
        }
        Screen::Select => {
            let page = app.list_page();
            scroll_to_bottom(
                &mut app.select_index,
                &mut app.select_scroll,
                app.select_rows.len(),
                page,
            );
        }
        Screen::Edit => {
            let page = edit_page(app);
            let len = app.state().draft.selected.len();
            scroll_to_bottom(&mut app.edit_index, &mut app.edit_scroll, len, page);
        }
        Screen::Review => app.review_scroll = review_len(app).saturating_sub(1),
    }
}
