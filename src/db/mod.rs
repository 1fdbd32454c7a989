mod schema;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::models::*;

pub(crate) struct Database {
    conn: Connection,
}

/// Result of `complete_password_reset`. Only `Completed` leaves changes behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResetCompletion {
    Completed,
    AlreadyUsed,
    UnknownUser,
}

/// Which statement `save_draft` ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DraftWrite {
    Created,
    Updated,
}

const USER_COLUMNS: &str = "id, email, password_hash, name, role, created_at, updated_at";
const RESET_COLUMNS: &str =
    "id, selector, verifier_hash, user_id, email, created_at, expires_at, consumed_at, ip, user_agent";
const DRAFT_COLUMNS: &str = "id, user_id, name, markup, include_materials, created_at, updated_at";

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current > schema::CURRENT_VERSION {
            anyhow::bail!(
                "Database version {current} is newer than this build supports ({})",
                schema::CURRENT_VERSION
            );
        }

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────

    pub(crate) fn insert_user(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, email, password_hash, name, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id,
                user.email,
                user.password_hash,
                user.name,
                user.role.as_str(),
                user.created_at,
                user.updated_at,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_user(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            email,
        )
    }

    pub(crate) fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.query_user(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"), id)
    }

    fn query_user(&self, sql: &str, key: &str) -> Result<Option<User>> {
        let result = self.conn.query_row(sql, params![key], row_to_user);
        match result {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn set_user_role_by_email(&self, email: &str, role: Role) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE users SET role = ?1, updated_at = ?2 WHERE email = ?3",
            params![role.as_str(), now, email],
        )?;
        Ok(changed > 0)
    }

    // ── Password resets ───────────────────────────────────────

    pub(crate) fn insert_password_reset(&self, reset: &PasswordReset) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO password_resets (selector, verifier_hash, user_id, email, created_at, expires_at, consumed_at, ip, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                reset.selector,
                reset.verifier_hash,
                reset.user_id,
                reset.email,
                reset.created_at,
                reset.expires_at,
                reset.consumed_at,
                reset.ip,
                reset.user_agent,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_password_reset_by_selector(
        &self,
        selector: &str,
    ) -> Result<Option<PasswordReset>> {
        let result = self.conn.query_row(
            &format!("SELECT {RESET_COLUMNS} FROM password_resets WHERE selector = ?1"),
            params![selector],
            |row| {
                Ok(PasswordReset {
                    id: Some(row.get(0)?),
                    selector: row.get(1)?,
                    verifier_hash: row.get(2)?,
                    user_id: row.get(3)?,
                    email: row.get(4)?,
                    created_at: row.get(5)?,
                    expires_at: row.get(6)?,
                    consumed_at: row.get(7)?,
                    ip: row.get(8)?,
                    user_agent: row.get(9)?,
                })
            },
        );
        match result {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Consume reset `reset_id` and store the new hash for `user_id` in one
    /// transaction. Nothing is written unless both rows change.
    pub(crate) fn complete_password_reset(
        &self,
        reset_id: i64,
        user_id: &str,
        password_hash: &str,
    ) -> Result<ResetCompletion> {
        let now = chrono::Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let consumed = tx.execute(
            "UPDATE password_resets SET consumed_at = ?1 WHERE id = ?2 AND consumed_at IS NULL",
            params![now, reset_id],
        )?;
        if consumed == 0 {
            return Ok(ResetCompletion::AlreadyUsed);
        }
        let changed = tx.execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, now, user_id],
        )?;
        if changed == 0 {
            return Ok(ResetCompletion::UnknownUser);
        }
        tx.commit()?;
        Ok(ResetCompletion::Completed)
    }

    // ── Drafts ────────────────────────────────────────────────

    /// Insert a never-saved snapshot (`created_at == updated_at`) or update an
    /// existing one owned by the same user.
    pub(crate) fn save_draft(&mut self, saved: &SavedDraft) -> Result<DraftWrite> {
        if saved.name.trim().is_empty() {
            anyhow::bail!("Draft name is required");
        }

        let tx = self.conn.transaction()?;
        let outcome = if saved.is_new() {
            tx.execute(
                "INSERT INTO drafts (id, user_id, name, markup, include_materials, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    saved.id,
                    saved.user_id,
                    saved.name,
                    saved.draft.markup,
                    saved.include_materials,
                    saved.created_at,
                    saved.updated_at,
                ],
            )
            .with_context(|| format!("Failed to create draft {}", saved.id))?;
            DraftWrite::Created
        } else {
            let changed = tx.execute(
                "UPDATE drafts SET name = ?1, markup = ?2, include_materials = ?3, updated_at = ?4
                 WHERE id = ?5 AND user_id = ?6",
                params![
                    saved.name,
                    saved.draft.markup,
                    saved.include_materials,
                    saved.updated_at,
                    saved.id,
                    saved.user_id,
                ],
            )?;
            if changed == 0 {
                anyhow::bail!("Draft not found: {}", saved.id);
            }
            tx.execute(
                "DELETE FROM draft_items WHERE draft_id = ?1",
                params![saved.id],
            )?;
            DraftWrite::Updated
        };

        for (position, item) in saved.draft.selected.iter().enumerate() {
            let line = saved.draft.line(&item.id);
            tx.execute(
                "INSERT INTO draft_items (draft_id, position, item_id, code, chapter, name, unit, parent_name,
                     pu_materials, pu_labor, quantity, materials_override, labor_override)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    saved.id,
                    position as i64,
                    item.id,
                    item.code,
                    item.chapter,
                    item.name,
                    item.unit.as_str(),
                    item.parent_name,
                    item.unit_price_materials.to_string(),
                    item.unit_price_labor.to_string(),
                    line.map(|l| l.quantity.as_str()),
                    line.and_then(|l| l.materials_override.as_deref()),
                    line.and_then(|l| l.labor_override.as_deref()),
                ],
            )?;
        }
        tx.commit()?;

        tracing::info!(draft_id = %saved.id, user_id = %saved.user_id, outcome = ?outcome, "draft saved");
        Ok(outcome)
    }

    /// The user's drafts, most recently updated first.
    pub(crate) fn get_drafts_for_user(&self, user_id: &str) -> Result<Vec<SavedDraft>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DRAFT_COLUMNS} FROM drafts WHERE user_id = ?1 ORDER BY updated_at DESC, name"
        ))?;
        let rows = stmt.query_map(params![user_id], row_to_draft_header)?;
        let mut drafts = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        for draft in &mut drafts {
            self.load_draft_items(draft)?;
        }
        Ok(drafts)
    }

    pub(crate) fn get_draft(&self, user_id: &str, id: &str) -> Result<Option<SavedDraft>> {
        let result = self.conn.query_row(
            &format!("SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            row_to_draft_header,
        );
        match result {
            Ok(mut d) => {
                self.load_draft_items(&mut d)?;
                Ok(Some(d))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn delete_draft(&self, user_id: &str, id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM drafts WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if changed > 0 {
            tracing::info!(draft_id = %id, user_id = %user_id, "draft deleted");
        }
        Ok(changed > 0)
    }

    fn load_draft_items(&self, saved: &mut SavedDraft) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, code, chapter, name, unit, parent_name, pu_materials, pu_labor,
                    quantity, materials_override, labor_override
             FROM draft_items WHERE draft_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![saved.id], |row| {
            let mut item = CatalogItem::new(
                row.get::<_, String>(0)?,
                row.get(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                Unit::parse(&row.get::<_, String>(4)?),
                parse_stored_decimal(&row.get::<_, String>(6)?),
                parse_stored_decimal(&row.get::<_, String>(7)?),
            );
            item.parent_name = row.get(5)?;
            let quantity: Option<String> = row.get(8)?;
            let line = quantity.map(|quantity| -> rusqlite::Result<DraftLine> {
                Ok(DraftLine {
                    item_id: item.id.clone(),
                    quantity,
                    materials_override: row.get(9)?,
                    labor_override: row.get(10)?,
                })
            });
            Ok((item, line.transpose()?))
        })?;

        let mut selected = Vec::new();
        let mut lines = BTreeMap::new();
        for row in rows {
            let (item, line) = row?;
            if let Some(line) = line {
                lines.insert(item.id.clone(), line);
            }
            selected.push(item);
        }
        saved.draft.selected = selected;
        saved.draft.lines = lines;
        Ok(())
    }

    // ── Subscriptions ─────────────────────────────────────────

    pub(crate) fn upsert_subscription(&self, sub: &Subscription) -> Result<()> {
        self.conn.execute(
            "INSERT INTO subscriptions (preapproval_id, user_email, status, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(preapproval_id) DO UPDATE SET
                user_email = excluded.user_email,
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![sub.preapproval_id, sub.user_email, sub.status, sub.updated_at],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn get_subscription(&self, preapproval_id: &str) -> Result<Option<Subscription>> {
        let result = self.conn.query_row(
            "SELECT preapproval_id, user_email, status, updated_at FROM subscriptions WHERE preapproval_id = ?1",
            params![preapproval_id],
            |row| {
                Ok(Subscription {
                    preapproval_id: row.get(0)?,
                    user_email: row.get(1)?,
                    status: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        );
        match result {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        role: Role::parse(&row.get::<_, String>(4)?),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn row_to_draft_header(row: &Row<'_>) -> rusqlite::Result<SavedDraft> {
    Ok(SavedDraft {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        draft: BudgetDraft::new(row.get::<_, String>(3)?),
        include_materials: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn parse_stored_decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap_or_default()
}

#[cfg(test)]
mod tests;
