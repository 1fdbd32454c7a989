pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    name          TEXT NOT NULL DEFAULT '',
    role          TEXT NOT NULL DEFAULT 'guest',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS password_resets (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    selector      TEXT NOT NULL UNIQUE,
    verifier_hash TEXT NOT NULL,
    user_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    email         TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    expires_at    TEXT NOT NULL,
    consumed_at   TEXT,
    ip            TEXT,
    user_agent    TEXT
);

CREATE INDEX IF NOT EXISTS idx_password_resets_user ON password_resets(user_id);

CREATE TABLE IF NOT EXISTS drafts (
    id                TEXT PRIMARY KEY,
    user_id           TEXT NOT NULL,
    name              TEXT NOT NULL,
    markup            TEXT NOT NULL DEFAULT '',
    include_materials BOOLEAN NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_drafts_user ON drafts(user_id, updated_at);

CREATE TABLE IF NOT EXISTS draft_items (
    draft_id           TEXT NOT NULL REFERENCES drafts(id) ON DELETE CASCADE,
    position           INTEGER NOT NULL,
    item_id            TEXT NOT NULL,
    code               INTEGER NOT NULL,
    chapter            TEXT NOT NULL DEFAULT '',
    name               TEXT NOT NULL DEFAULT '',
    unit               TEXT NOT NULL DEFAULT 'u',
    parent_name        TEXT NOT NULL DEFAULT '',
    pu_materials       TEXT NOT NULL,
    pu_labor           TEXT NOT NULL,
    quantity           TEXT,
    materials_override TEXT,
    labor_override     TEXT,
    PRIMARY KEY (draft_id, item_id)
);

CREATE TABLE IF NOT EXISTS subscriptions (
    preapproval_id TEXT PRIMARY KEY,
    user_email     TEXT NOT NULL,
    status         TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

"#;

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[];
