use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use super::app::{App, InputMode, PendingAction, Screen};
use super::util::{markup_from_input, parse_on_off};
use crate::db::{Database, DraftWrite};
use crate::export::{self, QuoteDocument};
use crate::models::{QuoteFooter, QuoteHeader};
use crate::pricing::coerce_decimal;
use crate::session::Action;

pub(crate) struct Command {
    pub(crate) description: &'static str,
    pub(crate) run: fn(&str, &mut App, &mut Database) -> anyhow::Result<()>,
}

macro_rules! register_command {
    ($name:expr, $desc:expr, $func:expr, $registry:expr) => {{
        $registry.insert(
            $name,
            Command {
                description: $desc,
                run: $func,
            },
        );
    }};
}

pub(crate) static COMMANDS: LazyLock<HashMap<&str, Command>> = LazyLock::new(|| {
    let mut r: HashMap<&str, Command> = HashMap::new();

    register_command!("q", "Salir", cmd_quit, r);
    register_command!("quit", "Salir", cmd_quit, r);
    register_command!("help", "Mostrar comandos", cmd_help, r);
    register_command!("h", "Mostrar comandos", cmd_help, r);
    register_command!("drafts", "Ir a Borradores", cmd_drafts, r);
    register_command!("select", "Ir a Selección", cmd_select, r);
    register_command!("edit", "Ir a Cantidades", cmd_edit, r);
    register_command!("review", "Ir a Revisión", cmd_review, r);
    register_command!(
        "markup",
        "Ajuste de obra (e.g. :markup 0.15 o :markup 15%)",
        cmd_markup,
        r
    );
    register_command!(
        "materials",
        "Incluir materiales (e.g. :materials off)",
        cmd_materials,
        r
    );
    register_command!("name", "Nombrar el presupuesto (e.g. :name Cocina)", cmd_name, r);
    register_command!(
        "save",
        "Guardar borrador (e.g. :save Cocina)",
        cmd_save,
        r
    );
    register_command!("w", "Guardar borrador", cmd_save, r);
    register_command!("new", "Empezar un presupuesto nuevo", cmd_new, r);
    register_command!(
        "delete-draft",
        "Borrar el borrador seleccionado",
        cmd_delete_draft,
        r
    );
    register_command!(
        "export",
        "Exportar PDF (e.g. :export ~/cocina.pdf)",
        cmd_export,
        r
    );
    register_command!(
        "export-csv",
        "Exportar CSV (e.g. :export-csv ~/cocina.csv)",
        cmd_export_csv,
        r
    );
    register_command!(
        "search",
        "Buscar en el catálogo (e.g. :search contrapiso)",
        cmd_search,
        r
    );
    register_command!("s", "Buscar en el catálogo", cmd_search, r);

    r
});

pub(crate) fn handle_command(input: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    let trimmed = input.trim();
    let mut parts = trimmed.splitn(2, ' ');
    let cmd_name = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    if let Some(cmd) = COMMANDS.get(cmd_name) {
        (cmd.run)(args, app, db)?;
    } else {
        let suggestion = find_closest(cmd_name);
        app.set_status(format!(
            "Comando desconocido: :{cmd_name}. ¿Quisiste decir :{suggestion}?"
        ));
    }

    Ok(())
}

fn find_closest(input: &str) -> String {
    COMMANDS
        .keys()
        .filter(|k| k.len() > 1) // skip single-letter aliases for suggestions
        .min_by_key(|k| levenshtein(input, k))
        .unwrap_or(&"help")
        .to_string()
}

fn levenshtein(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Move to `screen`, refusing wizard steps the draft cannot enter yet.
pub(crate) fn go_to(app: &mut App, db: &Database, screen: Screen) -> anyhow::Result<()> {
    if let Some(step) = screen.step() {
        if !app.state().can_enter(step) {
            let reason = match screen {
                Screen::Edit => "Seleccioná al menos un ítem",
                _ => "Completá cantidades mayores a cero en todos los ítems",
            };
            app.set_status(reason);
            return Ok(());
        }
        if app.state().step != step {
            app.dispatch(Action::SetStep(step));
        }
    }
    match screen {
        Screen::Drafts => app.refresh_drafts(db)?,
        Screen::Edit => app.clamp_edit_index(),
        Screen::Review => app.review_scroll = 0,
        Screen::Select => {}
    }
    app.screen = screen;
    app.set_status(format!("{screen}"));
    Ok(())
}

/// Build the printable quote for the current session.
pub(crate) fn current_document(app: &App) -> QuoteDocument {
    let state = app.state();
    QuoteDocument::build(
        &state.draft.selected,
        &state.draft.lines,
        &state.draft.markup,
        state.include_materials,
        QuoteHeader::default(),
        QuoteFooter::default(),
    )
}

// ── Command implementations ──────────────────────────────────

fn cmd_quit(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.running = false;
    Ok(())
}

fn cmd_help(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.show_help = true;
    Ok(())
}

fn cmd_drafts(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    go_to(app, db, Screen::Drafts)
}

fn cmd_select(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    go_to(app, db, Screen::Select)
}

fn cmd_edit(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    go_to(app, db, Screen::Edit)
}

fn cmd_review(_args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    go_to(app, db, Screen::Review)
}

fn cmd_markup(args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if args.is_empty() {
        let current = export::format_rate(coerce_decimal(&app.state().draft.markup));
        app.set_status(format!("Ajuste de obra: {current}. Uso: :markup 0.15"));
        return Ok(());
    }
    let value = markup_from_input(args);
    app.dispatch(Action::SetMarkup(value.clone()));
    app.set_status(format!(
        "Ajuste de obra: {}",
        export::format_rate(coerce_decimal(&value))
    ));
    Ok(())
}

fn cmd_materials(args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    let include = if args.is_empty() {
        !app.state().include_materials
    } else {
        match parse_on_off(args) {
            Some(v) => v,
            None => {
                app.set_status("Uso: :materials on|off");
                return Ok(());
            }
        }
    };
    app.dispatch(Action::SetIncludeMaterials(include));
    app.set_status(if include {
        "Materiales incluidos"
    } else {
        "Solo mano de obra"
    });
    Ok(())
}

fn cmd_name(args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if args.is_empty() {
        app.set_status("Uso: :name <nombre>");
        return Ok(());
    }
    app.dispatch(Action::SetName(args.to_string()));
    app.set_status(format!("Nombre: {args}"));
    Ok(())
}

fn cmd_save(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    if !args.is_empty() {
        app.dispatch(Action::SetName(args.to_string()));
    }
    if app.state().name.trim().is_empty() {
        app.set_status("Poné un nombre: :save <nombre>");
        return Ok(());
    }

    let now = chrono::Utc::now().to_rfc3339();
    let saved = app.state().to_saved_draft(&app.user.id, &now);
    match db.save_draft(&saved) {
        Ok(write) => {
            app.dispatch(Action::MarkSaved {
                draft_id: saved.id.clone(),
                created_at: saved.created_at.clone(),
                updated_at: saved.updated_at.clone(),
            });
            app.refresh_drafts(db)?;
            let verb = match write {
                DraftWrite::Created => "creado",
                DraftWrite::Updated => "actualizado",
            };
            app.set_status(format!("Borrador {verb}: {}", saved.name));
        }
        Err(e) => app.set_status(format!("No se pudo guardar: {e:#}")),
    }
    Ok(())
}

fn cmd_new(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    app.confirm_message = "¿Descartar el presupuesto actual y empezar otro?".into();
    app.pending_action = Some(PendingAction::NewDraft);
    app.input_mode = InputMode::Confirm;
    Ok(())
}

fn cmd_delete_draft(_args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if app.screen != Screen::Drafts {
        app.set_status("Andá a Borradores primero (1)");
        return Ok(());
    }
    if let Some(saved) = app.drafts.get(app.draft_index) {
        let name = saved.name.clone();
        app.confirm_message = format!("¿Borrar '{name}'?");
        app.pending_action = Some(PendingAction::DeleteDraft {
            id: saved.id.clone(),
            name,
        });
        app.input_mode = InputMode::Confirm;
    }
    Ok(())
}

fn export_path(args: &str, app: &App, extension: &str) -> PathBuf {
    if args.is_empty() {
        PathBuf::from(format!("{}.{extension}", current_document(app).file_stem()))
    } else {
        PathBuf::from(crate::run::shellexpand(args))
    }
}

fn cmd_export(args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if !app.state().can_enter(crate::session::Step::Review) {
        app.set_status("Completá las cantidades antes de exportar");
        return Ok(());
    }
    let path = export_path(args, app, "pdf");
    match export::write_pdf(&current_document(app), &path) {
        Ok(()) => app.set_status(format!("PDF exportado a {}", path.display())),
        Err(e) => app.set_status(format!("No se pudo exportar: {e:#}")),
    }
    Ok(())
}

fn cmd_export_csv(args: &str, app: &mut App, _db: &mut Database) -> anyhow::Result<()> {
    if !app.state().can_enter(crate::session::Step::Review) {
        app.set_status("Completá las cantidades antes de exportar");
        return Ok(());
    }
    let path = export_path(args, app, "csv");
    match export::write_csv(&current_document(app), &path) {
        Ok(()) => app.set_status(format!("CSV exportado a {}", path.display())),
        Err(e) => app.set_status(format!("No se pudo exportar: {e:#}")),
    }
    Ok(())
}

fn cmd_search(args: &str, app: &mut App, db: &mut Database) -> anyhow::Result<()> {
    app.search_input = args.to_string();
    app.select_index = 0;
    app.select_scroll = 0;
    app.refresh_select_rows();
    go_to(app, db, Screen::Select)?;

    if args.is_empty() {
        app.set_status("Búsqueda borrada");
    } else {
        app.set_status(format!("Buscando: {args}"));
    }
    Ok(())
}
