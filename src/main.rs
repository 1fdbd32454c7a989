mod auth;
mod billing;
mod catalog;
mod config;
mod db;
mod export;
mod models;
mod pricing;
mod run;
mod session;
mod ui;

use anyhow::{Context, Result};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let paths = config::Paths::resolve()?;
    paths.ensure_directories()?;
    init_logging(&paths)?;

    let settings = config::Settings::load(&paths)?;
    let mut db = db::Database::open(&paths.database_file())?;

    match args.len() {
        1 => run::as_tui(&paths, settings, &mut db),
        2.. => run::as_cli(&args, &paths, &settings, &mut db),
        _ => {
            eprintln!("Usage: obratui [command]");
            Ok(())
        }
    }
}

/// Log to `<data_dir>/obratui.log`; the terminal belongs to the TUI.
fn init_logging(paths: &config::Paths) -> Result<()> {
    let path = paths.log_file();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    let filter = EnvFilter::try_from_env("OBRATUI_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))
}
