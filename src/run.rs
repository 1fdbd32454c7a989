mod cli;
mod tui;

use anyhow::Result;

use crate::db::Database;
use crate::models::User;
use crate::session::PersistedState;

pub(crate) use cli::as_cli;
pub(crate) use tui::as_tui;

/// Expand a leading `~/` to the home directory.
pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}

/// User recorded in `state.json`, if it still exists.
pub(crate) fn signed_in_user(db: &Database, state: &PersistedState) -> Result<Option<User>> {
    match state.user_id.as_deref() {
        Some(id) => db.get_user_by_id(id),
        None => Ok(None),
    }
}
