use anyhow::{Context, Result};
use std::path::PathBuf;

use super::{shellexpand, signed_in_user};
use crate::auth::{self, IssueOptions, LogMailer};
use crate::billing::{self, MercadoPago, NotificationOutcome};
use crate::catalog::{filter_by_search, partition_parents_and_children, CatalogSource};
use crate::config::{Paths, Settings};
use crate::db::Database;
use crate::export::{self, format_amount, format_rate, QuoteDocument};
use crate::models::{HeaderInput, QuoteFooter, QuoteHeader, SavedDraft, User};
use crate::pricing::compute_totals;
use crate::session::{PersistedState, StateFile, WizardState};

pub(crate) fn as_cli(
    args: &[String],
    paths: &Paths,
    settings: &Settings,
    db: &mut Database,
) -> Result<()> {
    let ctx = Cli {
        paths,
        settings,
        state_file: StateFile::new(paths.state_file()),
    };
    let rest = &args[2..];
    match args[1].as_str() {
        "register" => ctx.register(rest, db),
        "login" => ctx.login(rest, db),
        "logout" => ctx.logout(),
        "whoami" => ctx.whoami(db),
        "forgot-password" => ctx.forgot_password(rest, db),
        "reset-password" => ctx.reset_password(rest, db),
        "subscribe" => ctx.subscribe(db),
        "webhook" => ctx.webhook(rest, db),
        "catalog" => ctx.catalog(rest),
        "drafts" => ctx.drafts(db),
        "quote" => ctx.quote(rest, db),
        "export" => ctx.export(rest, db, Format::Pdf),
        "export-csv" => ctx.export(rest, db, Format::Csv),
        "delete-draft" => ctx.delete_draft(rest, db),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("obratui {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("ObraTUI - presupuestos de obra desde la terminal");
    println!();
    println!("Usage: obratui [command]");
    println!();
    println!("Commands:");
    println!("  (none)                        Launch the quote wizard");
    println!("  register <email>              Create an account");
    println!("    --name <name>               Display name");
    println!("  login <email>                 Sign in");
    println!("  logout                        Sign out");
    println!("  whoami                        Show the signed-in user");
    println!("  forgot-password <email>       Request a password reset link");
    println!("  reset-password <token>        Choose a new password");
    println!("  subscribe                     Start the monthly subscription checkout");
    println!("  webhook --type <kind> --id <id>");
    println!("                                Process a payment notification");
    println!("  catalog [query]               List catalog items");
    println!("  drafts                        List saved drafts");
    println!("  quote <draft>                 Print a quote summary");
    println!("    --labor-only                Exclude materials");
    println!("  export <draft> [file.pdf]     Export a quote as PDF");
    println!("    --labor-only                Exclude materials");
    println!("    --title <title>             Presupuesto de obra | Remodelación | Mantenimiento");
    println!("    --client <name>             Client name");
    println!("    --address <address>         Site address");
    println!("    --date <yyyy-mm-dd>         Quote date (default: today)");
    println!("    --time <estimate>           Time estimate");
    println!("    --issuer <name>             Issuer shown in the footer");
    println!("    --issuer-address <address>  Issuer address shown in the footer");
    println!("    --contact <contact>         Contact shown in the footer");
    println!("  export-csv <draft> [file.csv] Export a quote as CSV (same flags as export)");
    println!("  delete-draft <draft>          Delete a saved draft");
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
    println!();
    println!("Drafts may be given by id, id prefix or name.");
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Positional arguments, skipping flags and their values.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--labor-only" {
            continue;
        }
        if arg.starts_with("--") {
            iter.next();
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Pdf,
    Csv,
}

impl Format {
    fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
        }
    }
}

struct Cli<'a> {
    paths: &'a Paths,
    settings: &'a Settings,
    state_file: StateFile,
}

impl Cli<'_> {
    fn current_user(&self, db: &Database) -> Result<User> {
        let state = self.state_file.load();
        signed_in_user(db, &state)?
            .ok_or_else(|| anyhow::anyhow!("Not signed in. Use: obratui login <email>"))
    }

    fn paying_user(&self, db: &Database) -> Result<User> {
        let user = self.current_user(db)?;
        if !billing::has_access(&user) {
            anyhow::bail!("No active subscription for {}. Use: obratui subscribe", user.email);
        }
        Ok(user)
    }

    fn set_signed_in(&self, user_id: Option<String>) -> Result<()> {
        let mut state = self.state_file.load();
        if state.user_id != user_id {
            // A different account never inherits the previous wizard session
            let wizard = WizardState::fresh(&self.settings.default_markup);
            state = PersistedState::new(user_id, wizard);
        }
        self.state_file.save(&state)
    }

    fn find_draft(&self, db: &Database, user: &User, key: &str) -> Result<SavedDraft> {
        if let Some(saved) = db.get_draft(&user.id, key)? {
            return Ok(saved);
        }
        let drafts = db.get_drafts_for_user(&user.id)?;
        let lower = key.to_lowercase();
        let matches: Vec<&SavedDraft> = drafts
            .iter()
            .filter(|d| d.id.starts_with(key) || d.name.to_lowercase() == lower)
            .collect();
        match matches.as_slice() {
            [one] => Ok((*one).clone()),
            [] => anyhow::bail!("Draft '{key}' not found"),
            many => {
                let names: Vec<String> = many
                    .iter()
                    .map(|d| format!("  {}  {}", &d.id[..8.min(d.id.len())], d.name))
                    .collect();
                anyhow::bail!("'{key}' matches several drafts:\n{}", names.join("\n"));
            }
        }
    }

    // ── Account ──────────────────────────────────────────────

    fn register(&self, args: &[String], db: &mut Database) -> Result<()> {
        let Some(email) = positionals(args).first().copied() else {
            anyhow::bail!("Usage: obratui register <email> [--name <name>]");
        };
        let password = rpassword::prompt_password("Password: ")?;
        let confirm = rpassword::prompt_password("Repeat password: ")?;
        if password != confirm {
            anyhow::bail!("Passwords do not match");
        }
        let user = auth::register(db, email, &password, flag_value(args, "--name"))?;
        self.set_signed_in(Some(user.id.clone()))?;
        println!("Registered {} and signed in", user.email);
        println!("Run `obratui subscribe` to activate the wizard");
        Ok(())
    }

    fn login(&self, args: &[String], db: &mut Database) -> Result<()> {
        let Some(email) = args.first() else {
            anyhow::bail!("Usage: obratui login <email>");
        };
        let password = rpassword::prompt_password("Password: ")?;
        let user = auth::authenticate(db, email, &password)?;
        self.set_signed_in(Some(user.id.clone()))?;
        tracing::info!(user_id = %user.id, "signed in");
        println!("Signed in as {} ({})", user.display_name(), user.role.as_str());
        Ok(())
    }

    fn logout(&self) -> Result<()> {
        self.set_signed_in(None)?;
        println!("Signed out");
        Ok(())
    }

    fn whoami(&self, db: &mut Database) -> Result<()> {
        let state = self.state_file.load();
        match signed_in_user(db, &state)? {
            Some(user) => {
                println!("{} <{}>", user.display_name(), user.email);
                println!("  Role:    {}", user.role.as_str());
                println!(
                    "  Access:  {}",
                    if billing::has_access(&user) { "yes" } else { "no (subscribe)" }
                );
            }
            None => println!("Not signed in"),
        }
        Ok(())
    }

    fn forgot_password(&self, args: &[String], db: &mut Database) -> Result<()> {
        let Some(email) = args.first() else {
            anyhow::bail!("Usage: obratui forgot-password <email>");
        };
        let mailer = LogMailer::new(self.settings.email_from.clone());
        let opts = IssueOptions {
            ttl_minutes: self.settings.reset_ttl_minutes,
            base_url: self.settings.app_url.clone(),
            ip: None,
            user_agent: Some(format!("obratui/{}", env!("CARGO_PKG_VERSION"))),
        };
        auth::issue_password_reset(db, &mailer, email, &opts)?;
        println!("If the account exists, a reset link has been sent.");
        println!("(Development mailer: see {})", self.paths.log_file().display());
        Ok(())
    }

    fn reset_password(&self, args: &[String], db: &mut Database) -> Result<()> {
        let Some(token) = args.first() else {
            anyhow::bail!("Usage: obratui reset-password <token>");
        };
        let ticket = auth::verify_reset_token(db, token)?;
        println!("Resetting password for {}", auth::mask_email(&ticket.email));
        let password = rpassword::prompt_password("New password: ")?;
        let confirm = rpassword::prompt_password("Repeat password: ")?;
        if password != confirm {
            anyhow::bail!("Passwords do not match");
        }
        if password.is_empty() {
            anyhow::bail!("Password cannot be empty");
        }
        auth::reset_password(db, token, &password)?;
        println!("Password updated. Sign in with: obratui login {}", ticket.email);
        Ok(())
    }

    // ── Billing ──────────────────────────────────────────────

    fn subscribe(&self, db: &mut Database) -> Result<()> {
        let user = self.current_user(db)?;
        if billing::has_access(&user) {
            println!("{} already has access", user.email);
            return Ok(());
        }
        let provider = MercadoPago::from_settings(self.settings)?;
        let url = billing::start_subscription(&provider, self.settings, &user.email)?;
        println!("Complete the subscription at:");
        println!("  {url}");
        Ok(())
    }

    fn webhook(&self, args: &[String], db: &mut Database) -> Result<()> {
        let kind = flag_value(args, "--type").unwrap_or_default();
        let id = flag_value(args, "--id");
        let provider = MercadoPago::from_settings(self.settings)?;
        match billing::handle_notification(db, &provider, kind, id)? {
            NotificationOutcome::Ignored => println!("Ignored"),
            NotificationOutcome::Activated { email } => println!("Activated {email}"),
            NotificationOutcome::Unchanged { status } => println!("Unchanged (status: {status})"),
        }
        Ok(())
    }

    // ── Catalog & drafts ─────────────────────────────────────

    fn catalog(&self, args: &[String]) -> Result<()> {
        let query = args.join(" ");
        let (items, origin) = CatalogSource::load(self.settings);
        let partition = partition_parents_and_children(&items);
        let filtered = filter_by_search(&partition, &query);

        println!("Catalog ({origin})");
        println!("{}", "─".repeat(78));
        for parent in &filtered.parents {
            println!("{:<6} {}", parent.code, parent.chapter);
            for item in filtered.children_of(parent) {
                println!(
                    "  {:<6} {:<40} {:<4} {:>12} {:>12}",
                    item.code,
                    crate::ui::util::truncate(&item.name, 40),
                    item.unit.symbol(),
                    format_amount(item.unit_price_materials),
                    format_amount(item.unit_price_labor),
                );
            }
        }
        if filtered.children().next().is_none() {
            println!("No items match '{query}'");
        }
        Ok(())
    }

    fn drafts(&self, db: &mut Database) -> Result<()> {
        let user = self.current_user(db)?;
        let drafts = db.get_drafts_for_user(&user.id)?;
        if drafts.is_empty() {
            println!("No drafts");
            return Ok(());
        }

        println!("{:<10} {:<28} {:<20} {:>6} {:>16}", "ID", "Name", "Updated", "Items", "Total");
        println!("{}", "─".repeat(84));
        for d in &drafts {
            let totals = compute_totals(&d.draft.selected, &d.draft.lines, &d.draft.markup)
                .with_materials(d.include_materials);
            println!(
                "{:<10} {:<28} {:<20} {:>6} {:>16}",
                &d.id[..8.min(d.id.len())],
                crate::ui::util::truncate(&d.name, 28),
                d.updated_at.get(..16).unwrap_or(d.updated_at.as_str()),
                d.draft.selected.len(),
                format_amount(totals.total),
            );
        }
        Ok(())
    }

    fn quote(&self, args: &[String], db: &mut Database) -> Result<()> {
        let Some(key) = positionals(args).first().copied() else {
            anyhow::bail!("Usage: obratui quote <draft> [--labor-only]");
        };
        let user = self.paying_user(db)?;
        let saved = self.find_draft(db, &user, key)?;
        let include = saved.include_materials && !has_flag(args, "--labor-only");
        let doc = QuoteDocument::build(
            &saved.draft.selected,
            &saved.draft.lines,
            &saved.draft.markup,
            include,
            QuoteHeader::default(),
            QuoteFooter::default(),
        );

        println!("{}", saved.name);
        println!("{}", "─".repeat(70));
        for group in &doc.groups {
            println!("{:<52} {:>16}", group.name, format_amount(group.subtotal));
            for row in &group.rows {
                println!(
                    "  {:<36} {:>8} {:<4} {:>16}",
                    crate::ui::util::truncate(&row.name, 36),
                    row.quantity,
                    row.unit.symbol(),
                    format_amount(row.subtotal),
                );
            }
        }
        println!("{}", "─".repeat(70));
        if include {
            println!("  Materiales:   {:>16}", format_amount(doc.totals.materials_total));
        }
        println!("  Mano de obra: {:>16}", format_amount(doc.totals.labor_total));
        println!("  Subtotal:     {:>16}", format_amount(doc.totals.subtotal));
        println!(
            "  Ajuste {:<6} {:>16}",
            format_rate(doc.totals.markup_rate),
            format_amount(doc.totals.markup_amount())
        );
        println!("  TOTAL:        {:>16}", format_amount(doc.totals.total));
        Ok(())
    }

    fn export(&self, args: &[String], db: &mut Database, format: Format) -> Result<()> {
        let pos = positionals(args);
        let Some(key) = pos.first().copied() else {
            anyhow::bail!(
                "Usage: obratui export{} <draft> [path] [flags]",
                if format == Format::Csv { "-csv" } else { "" }
            );
        };
        let user = self.paying_user(db)?;
        let saved = self.find_draft(db, &user, key)?;
        if !saved.draft.can_review() {
            anyhow::bail!("Draft '{}' has items without a quantity", saved.name);
        }

        let header = QuoteHeader::from_input(&HeaderInput {
            title: flag_value(args, "--title").map(String::from),
            date: flag_value(args, "--date").map(String::from),
            client: flag_value(args, "--client").map(String::from),
            address: flag_value(args, "--address").map(String::from),
            time_estimate: flag_value(args, "--time").map(String::from),
        });
        let footer = QuoteFooter {
            issuer: flag_value(args, "--issuer").unwrap_or_default().to_string(),
            address: flag_value(args, "--issuer-address")
                .unwrap_or_default()
                .to_string(),
            contact: flag_value(args, "--contact").unwrap_or_default().to_string(),
        };
        let include = saved.include_materials && !has_flag(args, "--labor-only");
        let doc = QuoteDocument::build(
            &saved.draft.selected,
            &saved.draft.lines,
            &saved.draft.markup,
            include,
            header,
            footer,
        );

        let path = pos
            .get(1)
            .map(|p| PathBuf::from(shellexpand(p)))
            .unwrap_or_else(|| PathBuf::from(format!("{}.{}", doc.file_stem(), format.extension())));

        let written = match format {
            Format::Pdf => export::write_pdf(&doc, &path),
            Format::Csv => export::write_csv(&doc, &path),
        };
        written.with_context(|| format!("Failed to export '{}'", saved.name))?;
        println!(
            "Exported {} items ({}) to {}",
            doc.row_count(),
            format_amount(doc.totals.total),
            path.display()
        );
        Ok(())
    }

    fn delete_draft(&self, args: &[String], db: &mut Database) -> Result<()> {
        let Some(key) = args.first() else {
            anyhow::bail!("Usage: obratui delete-draft <draft>");
        };
        let user = self.current_user(db)?;
        let saved = self.find_draft(db, &user, key)?;
        if db.delete_draft(&user.id, &saved.id)? {
            println!("Deleted draft: {}", saved.name);
        } else {
            println!("Draft '{}' was already gone", saved.name);
        }
        Ok(())
    }
}
